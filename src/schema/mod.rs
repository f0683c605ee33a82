pub mod fetch;
pub mod types;

pub use fetch::{ensure_compatible, fetch_schema};
pub use types::{ColumnSchema, SchemaFile, TableSchema, SCHEMA_URL, SCHEMA_VERSION};
