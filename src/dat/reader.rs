// src/dat/reader.rs

use std::collections::HashMap;

use crate::error::{Error, Result};

use super::file::DatFile;
use super::header::{scalar_footprint, ColumnKind, Header};
use super::value::Value;

/// All-ones key value meaning "no reference".
const NULL_KEY: u64 = u64::MAX;

/// Row widths of the tables referenced by key columns, keyed by the
/// referencing column's name. Stored key values are byte offsets into the
/// target table's fixed region; its row width turns them back into row
/// indices. The schema doesn't name the target, so widths come from the
/// caller.
#[derive(Debug, Clone, Default)]
pub struct KeyWidths {
    by_column: HashMap<String, u64>,
}

impl KeyWidths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: impl Into<String>, width: u64) {
        self.by_column.insert(column.into(), width);
    }

    fn get(&self, column: &str) -> Option<u64> {
        self.by_column.get(column).copied()
    }
}

/// Decode one column across every row of `dat`.
///
/// Deterministic and read-only: the same header and bytes always produce
/// the same values.
pub fn read_column(header: &Header, dat: &DatFile, keys: &KeyWidths) -> Result<Vec<Value>> {
    if header.ty.kind == ColumnKind::Unmapped {
        // a zero-footprint hole; there is nothing to read
        return Ok(vec![Value::Null; dat.row_count]);
    }

    let fixed = dat.fixed();
    let heap = dat.heap();
    let mut out = Vec::with_capacity(dat.row_count);

    for row in 0..dat.row_count {
        let base = (row * dat.row_width + header.offset) as u64;
        let value = if header.ty.array {
            read_array(header, row, base, fixed, heap, keys)?
        } else {
            read_scalar(header, row, fixed, base, heap, keys)?
        };
        out.push(value);
    }
    Ok(out)
}

fn read_array(
    header: &Header,
    row: usize,
    base: u64,
    fixed: &[u8],
    heap: &[u8],
    keys: &KeyWidths,
) -> Result<Value> {
    let count = read_u64(fixed, base)?;
    let start = read_u64(fixed, base + 8)?;
    if count == 0 {
        // the stored offset of an empty array may be garbage; never
        // dereference it
        return Ok(Value::Array(Vec::new()));
    }

    let stride = scalar_footprint(header.ty.kind) as u64;
    bounds_check(heap, start, count.saturating_mul(stride))?;

    let mut elems = Vec::with_capacity(count as usize);
    for i in 0..count {
        elems.push(read_scalar(header, row, heap, start + i * stride, heap, keys)?);
    }
    Ok(Value::Array(elems))
}

/// Decode one element of `header`'s scalar kind. The value bytes sit in
/// `buf` at `at`; text and key indirections resolve against `heap`. For
/// top-level cells `buf` is the fixed region, for array elements it is
/// the heap itself.
fn read_scalar(
    header: &Header,
    row: usize,
    buf: &[u8],
    at: u64,
    heap: &[u8],
    keys: &KeyWidths,
) -> Result<Value> {
    match header.ty.kind {
        ColumnKind::Integer { size, signed } => {
            let raw = read_le(buf, at, size)?;
            let n = if signed {
                sign_extend(raw, size)
            } else {
                raw as i64
            };
            Ok(Value::Int(n))
        }
        ColumnKind::Decimal { size } => {
            let raw = read_le(buf, at, size)?;
            let v = match size {
                4 => f32::from_bits(raw as u32) as f64,
                _ => f64::from_bits(raw),
            };
            Ok(Value::Float(v))
        }
        ColumnKind::Bool => Ok(Value::Bool(read_le(buf, at, 1)? != 0)),
        ColumnKind::Text => {
            let offset = read_u64(buf, at)?;
            Ok(Value::Text(read_text(heap, offset)?))
        }
        ColumnKind::Key { .. } => {
            let raw = read_u64(buf, at)?;
            if raw == NULL_KEY {
                return Ok(Value::Null);
            }
            let width = keys.get(&header.name).ok_or_else(|| Error::KeyTargetUnknown {
                column: header.name.clone(),
            })?;
            if width == 0 || raw % width != 0 {
                return Err(Error::KeyMisaligned {
                    column: header.name.clone(),
                    row,
                    value: raw,
                    width,
                });
            }
            Ok(Value::Key(raw / width))
        }
        // unreachable from read_column, which short-circuits unmapped
        ColumnKind::Unmapped => Ok(Value::Null),
    }
}

/// UTF-16LE code units from `offset` up to (not including) the first zero
/// unit. Unpaired surrogates decode lossily.
fn read_text(heap: &[u8], offset: u64) -> Result<String> {
    let mut units = Vec::new();
    let mut at = offset;
    loop {
        let unit = read_le(heap, at, 2).map_err(|_| Error::UnterminatedText { offset })? as u16;
        if unit == 0 {
            break;
        }
        units.push(unit);
        at += 2;
    }
    Ok(String::from_utf16_lossy(&units))
}

fn read_u64(buf: &[u8], at: u64) -> Result<u64> {
    read_le(buf, at, 8)
}

fn read_le(buf: &[u8], at: u64, size: usize) -> Result<u64> {
    bounds_check(buf, at, size as u64)?;
    let at = at as usize;
    let mut v = 0u64;
    for (i, byte) in buf[at..at + size].iter().enumerate() {
        v |= (*byte as u64) << (8 * i);
    }
    Ok(v)
}

fn bounds_check(buf: &[u8], offset: u64, len: u64) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= buf.len() as u64 => Ok(()),
        _ => Err(Error::OutOfBounds {
            offset,
            len,
            have: buf.len(),
        }),
    }
}

fn sign_extend(raw: u64, size: usize) -> i64 {
    let shift = 64 - 8 * size as u32;
    ((raw << shift) as i64) >> shift
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dat::header::ColumnType;

    fn header(name: &str, offset: usize, kind: ColumnKind, array: bool) -> Header {
        Header {
            name: name.to_string(),
            offset,
            ty: ColumnType { kind, array },
        }
    }

    /// Assemble a full table image and parse it. `heap_payload` lands at
    /// heap offset 8, right after the boundary marker.
    fn dat(row_count: u32, fixed: &[u8], heap_payload: &[u8]) -> DatFile {
        let mut bytes = row_count.to_le_bytes().to_vec();
        bytes.extend_from_slice(fixed);
        bytes.extend_from_slice(&[0xBB; 8]);
        bytes.extend_from_slice(heap_payload);
        DatFile::parse(bytes).unwrap()
    }

    fn utf16z(s: &str) -> Vec<u8> {
        let mut bytes: Vec<u8> = s.encode_utf16().flat_map(u16::to_le_bytes).collect();
        bytes.extend_from_slice(&[0, 0]);
        bytes
    }

    const I32: ColumnKind = ColumnKind::Integer {
        size: 4,
        signed: true,
    };

    #[test]
    fn reads_signed_integers() {
        let mut fixed = 7i32.to_le_bytes().to_vec();
        fixed.extend_from_slice(&(-2i32).to_le_bytes());
        let dat = dat(2, &fixed, &[]);

        let col = read_column(&header("Level", 0, I32, false), &dat, &KeyWidths::new()).unwrap();
        assert_eq!(col, vec![Value::Int(7), Value::Int(-2)]);
    }

    #[test]
    fn reads_narrow_and_unsigned_integers() {
        // one row: i16 = -1, u8 = 0xFE
        let fixed = [0xFF, 0xFF, 0xFE];
        let dat = dat(1, &fixed, &[]);

        let i16_col = header(
            "A",
            0,
            ColumnKind::Integer {
                size: 2,
                signed: true,
            },
            false,
        );
        let u8_col = header(
            "B",
            2,
            ColumnKind::Integer {
                size: 1,
                signed: false,
            },
            false,
        );
        let keys = KeyWidths::new();
        assert_eq!(read_column(&i16_col, &dat, &keys).unwrap(), vec![Value::Int(-1)]);
        assert_eq!(read_column(&u8_col, &dat, &keys).unwrap(), vec![Value::Int(254)]);
    }

    #[test]
    fn reads_decimals_and_bools() {
        let mut fixed = 1.5f32.to_le_bytes().to_vec();
        fixed.push(1);
        fixed.extend_from_slice(&0.25f32.to_le_bytes());
        fixed.push(0);
        let dat = dat(2, &fixed, &[]);

        let keys = KeyWidths::new();
        let floats = read_column(
            &header("Scale", 0, ColumnKind::Decimal { size: 4 }, false),
            &dat,
            &keys,
        )
        .unwrap();
        assert_eq!(floats, vec![Value::Float(1.5), Value::Float(0.25)]);

        let bools = read_column(&header("Hidden", 4, ColumnKind::Bool, false), &dat, &keys).unwrap();
        assert_eq!(bools, vec![Value::Bool(true), Value::Bool(false)]);
    }

    #[test]
    fn reads_heap_text() {
        let mut heap = utf16z("of the Whale");
        let second_at = 8 + heap.len() as u64;
        heap.extend_from_slice(&utf16z(""));

        let mut fixed = 8u64.to_le_bytes().to_vec();
        fixed.extend_from_slice(&second_at.to_le_bytes());
        let dat = dat(2, &fixed, &heap);

        let col = read_column(
            &header("Name", 0, ColumnKind::Text, false),
            &dat,
            &KeyWidths::new(),
        )
        .unwrap();
        assert_eq!(
            col,
            vec![Value::Text("of the Whale".into()), Value::Text(String::new())]
        );
    }

    #[test]
    fn unterminated_text_is_an_error() {
        // a single 'a' code unit and no terminator
        let heap = vec![0x61, 0x00];
        let fixed = 8u64.to_le_bytes().to_vec();
        let dat = dat(1, &fixed, &heap);

        let err = read_column(
            &header("Name", 0, ColumnKind::Text, false),
            &dat,
            &KeyWidths::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnterminatedText { offset: 8 }));
    }

    #[test]
    fn key_sentinel_resolves_to_null() {
        let fixed = u64::MAX.to_le_bytes().to_vec();
        let dat = dat(1, &fixed, &[]);

        // no width configured: the sentinel must still resolve
        let col = read_column(
            &header("StatsKey1", 0, ColumnKind::Key { foreign: true }, false),
            &dat,
            &KeyWidths::new(),
        )
        .unwrap();
        assert_eq!(col, vec![Value::Null]);
    }

    #[test]
    fn key_divides_by_target_row_width() {
        let fixed = 48u64.to_le_bytes().to_vec();
        let dat = dat(1, &fixed, &[]);

        let mut keys = KeyWidths::new();
        keys.set("StatsKey1", 24);
        let col = read_column(
            &header("StatsKey1", 0, ColumnKind::Key { foreign: true }, false),
            &dat,
            &keys,
        )
        .unwrap();
        assert_eq!(col, vec![Value::Key(2)]);
    }

    #[test]
    fn misaligned_key_is_fatal() {
        let fixed = 50u64.to_le_bytes().to_vec();
        let dat = dat(1, &fixed, &[]);

        let mut keys = KeyWidths::new();
        keys.set("StatsKey1", 24);
        let err = read_column(
            &header("StatsKey1", 0, ColumnKind::Key { foreign: true }, false),
            &dat,
            &keys,
        )
        .unwrap_err();
        match err {
            Error::KeyMisaligned {
                column,
                row,
                value,
                width,
            } => {
                assert_eq!(column, "StatsKey1");
                assert_eq!(row, 0);
                assert_eq!(value, 50);
                assert_eq!(width, 24);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_null_key_without_target_is_an_error() {
        let fixed = 24u64.to_le_bytes().to_vec();
        let dat = dat(1, &fixed, &[]);

        let err = read_column(
            &header("Families", 0, ColumnKind::Key { foreign: true }, false),
            &dat,
            &KeyWidths::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::KeyTargetUnknown { .. }));
    }

    #[test]
    fn empty_array_never_dereferences_its_offset() {
        let mut fixed = 0u64.to_le_bytes().to_vec();
        // an offset far outside the heap
        fixed.extend_from_slice(&0xDEAD_BEEFu64.to_le_bytes());
        let dat = dat(1, &fixed, &[]);

        let col = read_column(&header("Values", 0, I32, true), &dat, &KeyWidths::new()).unwrap();
        assert_eq!(col, vec![Value::Array(Vec::new())]);
    }

    #[test]
    fn reads_integer_arrays_from_heap() {
        let mut heap = Vec::new();
        for n in [10i32, 20, 30] {
            heap.extend_from_slice(&n.to_le_bytes());
        }
        let mut fixed = 3u64.to_le_bytes().to_vec();
        fixed.extend_from_slice(&8u64.to_le_bytes());
        let dat = dat(1, &fixed, &heap);

        let col = read_column(&header("Values", 0, I32, true), &dat, &KeyWidths::new()).unwrap();
        assert_eq!(
            col,
            vec![Value::Array(vec![
                Value::Int(10),
                Value::Int(20),
                Value::Int(30)
            ])]
        );
    }

    #[test]
    fn array_elements_of_text_are_pointers_into_the_same_heap() {
        // heap layout: [two u64 pointers][first string][second string]
        let strings_at = 8 + 16u64;
        let first = utf16z("alpha");
        let second_at = strings_at + first.len() as u64;

        let mut heap = strings_at.to_le_bytes().to_vec();
        heap.extend_from_slice(&second_at.to_le_bytes());
        heap.extend_from_slice(&first);
        heap.extend_from_slice(&utf16z("beta"));

        let mut fixed = 2u64.to_le_bytes().to_vec();
        fixed.extend_from_slice(&8u64.to_le_bytes());
        let dat = dat(1, &fixed, &heap);

        let col = read_column(
            &header("Tags", 0, ColumnKind::Text, true),
            &dat,
            &KeyWidths::new(),
        )
        .unwrap();
        assert_eq!(
            col,
            vec![Value::Array(vec![
                Value::Text("alpha".into()),
                Value::Text("beta".into())
            ])]
        );
    }

    #[test]
    fn oversized_array_count_is_out_of_bounds_not_oom() {
        let mut fixed = u64::MAX.to_le_bytes().to_vec();
        fixed.extend_from_slice(&8u64.to_le_bytes());
        let dat = dat(1, &fixed, &[0; 16]);

        let err = read_column(&header("Values", 0, I32, true), &dat, &KeyWidths::new()).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { .. }));
    }

    #[test]
    fn unmapped_column_decodes_to_nulls_without_reading() {
        // the table has no bytes at all beyond the marker
        let dat = dat(3, &[0; 3], &[]);
        let col = read_column(
            &header("Mystery", 1, ColumnKind::Unmapped, false),
            &dat,
            &KeyWidths::new(),
        )
        .unwrap();
        assert_eq!(col, vec![Value::Null, Value::Null, Value::Null]);
    }

    #[test]
    fn truncated_row_is_out_of_bounds() {
        // row claims an i32 at offset 2 of a 4-byte row
        let dat = dat(1, &[0; 4], &[]);
        let err = read_column(&header("Level", 2, I32, false), &dat, &KeyWidths::new()).unwrap_err();
        assert!(matches!(
            err,
            Error::OutOfBounds {
                offset: 2,
                len: 4,
                have: 4
            }
        ));
    }

    #[test]
    fn zero_rows_decode_to_empty_columns() {
        let dat = dat(0, &[], b"whatever heap bytes");
        let col = read_column(
            &header("Name", 0, ColumnKind::Text, false),
            &dat,
            &KeyWidths::new(),
        )
        .unwrap();
        assert!(col.is_empty());
    }

    #[test]
    fn decoding_is_deterministic() {
        let mut heap = utf16z("same");
        heap.extend_from_slice(&utf16z("bytes"));
        let mut fixed = 8u64.to_le_bytes().to_vec();
        fixed.extend_from_slice(&18u64.to_le_bytes());
        let dat = dat(2, &fixed, &heap);

        let h = header("Name", 0, ColumnKind::Text, false);
        let keys = KeyWidths::new();
        let first = read_column(&h, &dat, &keys).unwrap();
        let second = read_column(&h, &dat, &keys).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rows_decode_independently_with_overlapping_heap_ranges() {
        // One i32 column and one array-of-text column over two rows. Row 0's
        // array covers two pointers, row 1's array reuses the second string;
        // the byte ranges overlap but the content spans do not collide.
        let ptrs_at = 8u64;
        let strings_at = ptrs_at + 3 * 8;
        let first = utf16z("cold");
        let second_at = strings_at + first.len() as u64;

        let mut heap = Vec::new();
        heap.extend_from_slice(&strings_at.to_le_bytes());
        heap.extend_from_slice(&second_at.to_le_bytes());
        heap.extend_from_slice(&second_at.to_le_bytes());
        heap.extend_from_slice(&first);
        heap.extend_from_slice(&utf16z("colder"));

        let row_0 = {
            let mut r = 41i32.to_le_bytes().to_vec();
            r.extend_from_slice(&2u64.to_le_bytes());
            r.extend_from_slice(&ptrs_at.to_le_bytes());
            r
        };
        let row_1 = {
            let mut r = 42i32.to_le_bytes().to_vec();
            r.extend_from_slice(&1u64.to_le_bytes());
            r.extend_from_slice(&(ptrs_at + 16).to_le_bytes());
            r
        };
        let mut fixed = row_0;
        fixed.extend_from_slice(&row_1);
        let dat = dat(2, &fixed, &heap);

        let keys = KeyWidths::new();
        let levels = read_column(&header("Level", 0, I32, false), &dat, &keys).unwrap();
        let tags = read_column(&header("Tags", 4, ColumnKind::Text, true), &dat, &keys).unwrap();

        assert_eq!(levels, vec![Value::Int(41), Value::Int(42)]);
        assert_eq!(
            tags,
            vec![
                Value::Array(vec![Value::Text("cold".into()), Value::Text("colder".into())]),
                Value::Array(vec![Value::Text("colder".into())]),
            ]
        );
    }
}
