// src/schema/types.rs

use serde::Deserialize;

/// Schema generation this decoder was built against.
pub const SCHEMA_VERSION: u32 = 3;

/// Where the community-maintained schema document is published.
pub const SCHEMA_URL: &str =
    "https://github.com/poe-tool-dev/dat-schema/releases/download/latest/schema.min.json";

/// The published schema document. Only the fields the decoder consumes
/// are modeled; the document carries more.
#[derive(Debug, Deserialize)]
pub struct SchemaFile {
    pub version: u32,
    pub tables: Vec<TableSchema>,
}

/// Ordered column layout of one table. The declared order is the physical
/// byte order in the row.
#[derive(Debug, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
}

#[derive(Debug, Deserialize)]
pub struct ColumnSchema {
    /// Unnamed columns exist in the wild; they still occupy row bytes.
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub array: bool,
}
