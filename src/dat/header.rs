// src/dat/header.rs

use crate::schema::TableSchema;

/// Scalar kinds a column can hold. `Unmapped` covers schema type tags this
/// decoder has no layout for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer { size: usize, signed: bool },
    Decimal { size: usize },
    Text,
    Bool,
    /// A reference to a row in this or another table.
    Key { foreign: bool },
    Unmapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnType {
    pub kind: ColumnKind,
    pub array: bool,
}

impl ColumnType {
    /// Map a schema type tag onto a concrete layout.
    pub fn from_tag(tag: &str, array: bool) -> Self {
        let kind = match tag {
            "i32" => ColumnKind::Integer {
                size: 4,
                signed: true,
            },
            // enum references are stored as plain 4-byte row numbers
            "enumrow" => ColumnKind::Integer {
                size: 4,
                signed: true,
            },
            "f32" => ColumnKind::Decimal { size: 4 },
            "string" => ColumnKind::Text,
            "bool" => ColumnKind::Bool,
            "row" => ColumnKind::Key { foreign: false },
            "foreignrow" => ColumnKind::Key { foreign: true },
            _ => ColumnKind::Unmapped,
        };
        ColumnType { kind, array }
    }
}

/// One column's place in the fixed row region.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub name: String,
    pub offset: usize,
    pub ty: ColumnType,
}

/// Bytes a column occupies in the fixed row region. Heap payloads are not
/// counted; they live behind 8-byte offsets.
///
/// The same table drives the layout builder and the reader; one wrong
/// footprint here shifts every later column.
pub fn footprint(ty: ColumnType) -> usize {
    if ty.kind == ColumnKind::Unmapped {
        // unknown tags take no space in the row
        return 0;
    }
    if ty.array {
        // 8-byte element count + 8-byte heap offset
        return 16;
    }
    scalar_footprint(ty.kind)
}

/// Footprint of one non-array element of `kind`; also the stride between
/// array elements in the heap.
pub(crate) fn scalar_footprint(kind: ColumnKind) -> usize {
    match kind {
        ColumnKind::Integer { size, .. } => size,
        ColumnKind::Decimal { size } => size,
        ColumnKind::Bool => 1,
        ColumnKind::Text => 8,
        ColumnKind::Key { .. } => 8,
        ColumnKind::Unmapped => 0,
    }
}

/// Walk a table's declared columns and assign each its byte offset. The
/// declared order is the physical byte order in the row; nothing is
/// reordered or validated against the actual row width here.
pub fn build_headers(table: &TableSchema) -> Vec<Header> {
    let mut headers = Vec::with_capacity(table.columns.len());
    let mut offset = 0usize;
    for column in &table.columns {
        let ty = ColumnType::from_tag(&column.ty, column.array);
        headers.push(Header {
            name: column.name.clone().unwrap_or_default(),
            offset,
            ty,
        });
        offset += footprint(ty);
    }
    headers
}
