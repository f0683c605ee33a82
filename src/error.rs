// src/error.rs

use thiserror::Error;

/// Result alias for decode and protocol operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The published schema document is for a different format generation.
    #[error("schema version {found} is not compatible with this tool (expected {expected}); check for updates")]
    SchemaIncompatible { found: u32, expected: u32 },

    #[error("schema document has no table named \"{table}\"")]
    TableNotInSchema { table: String },

    #[error("table \"{table}\" doesn't have a column named \"{column}\"")]
    ColumnNotFound { table: String, column: String },

    /// A non-null key that is not an exact multiple of the target table's
    /// row width. Indicates a layout mismatch, never silently truncated.
    #[error("row {row}: key {value:#018x} in column \"{column}\" is not a multiple of the target row width {width}")]
    KeyMisaligned {
        column: String,
        row: usize,
        value: u64,
        width: u64,
    },

    #[error("column \"{column}\" holds row keys but no target table is configured for it")]
    KeyTargetUnknown { column: String },

    #[error("key target table \"{table}\" was not part of this export")]
    RefTableMissing { table: String },

    #[error("read of {len} bytes at offset {offset} runs past the end of a {have}-byte region")]
    OutOfBounds { offset: u64, len: u64, have: usize },

    #[error("string at heap offset {offset} has no terminator")]
    UnterminatedText { offset: u64 },

    #[error("variable-data boundary marker not found")]
    MissingBoundary,

    #[error("fixed region of {len} bytes does not divide evenly into {rows} rows")]
    UnevenRows { rows: u32, len: usize },

    #[error("patch server response of {len} bytes is too short to hold a version token")]
    ShortResponse { len: usize },

    #[error("patch server response contains no version token")]
    TokenNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}
