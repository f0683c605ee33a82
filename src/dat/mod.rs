pub mod file;
pub mod header;
pub mod reader;
pub mod value;

pub use file::DatFile;
pub use header::{build_headers, footprint, ColumnKind, ColumnType, Header};
pub use reader::{read_column, KeyWidths};
pub use value::{Record, Value};
