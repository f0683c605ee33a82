// src/export/mod.rs

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::bundle::FileSource;
use crate::dat::{build_headers, read_column, DatFile, Header, KeyWidths, Record, Value};
use crate::error::{Error, Result};
use crate::schema::{ensure_compatible, SchemaFile};

/// Which tables to export, with the columns wanted from each.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    pub tables: Vec<TableExport>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableExport {
    pub name: String,
    pub columns: Vec<String>,
    /// Target table per key column, for resolving row references.
    #[serde(default)]
    pub refs: HashMap<String, String>,
}

/// Where a table's raw bytes live under the content root.
fn table_path(name: &str) -> String {
    format!("Data/{name}.dat64")
}

/// Fetch, decode and materialize every configured table.
///
/// The schema gate runs before any byte fetch. Tables are then processed
/// one at a time in the configured order: one pass pulling raw bytes (so
/// every table's row width is known before key columns resolve), one pass
/// decoding.
#[instrument(level = "info", skip_all)]
pub async fn export_tables<S: FileSource>(
    config: &ExportConfig,
    schema: &SchemaFile,
    source: &S,
) -> Result<HashMap<String, Vec<Record>>> {
    ensure_compatible(schema)?;
    source.invalidate_cache();

    let mut files: Vec<DatFile> = Vec::with_capacity(config.tables.len());
    for target in &config.tables {
        let path = table_path(&target.name);
        let bytes = source.file_contents(&path).await?;
        let dat = DatFile::parse(bytes)?;
        info!(
            table = %target.name,
            rows = dat.row_count,
            width = dat.row_width,
            "parsed table"
        );
        files.push(dat);
    }
    let widths: HashMap<&str, u64> = config
        .tables
        .iter()
        .zip(&files)
        .map(|(target, dat)| (target.name.as_str(), dat.row_width as u64))
        .collect();

    let mut out = HashMap::with_capacity(files.len());
    for (target, dat) in config.tables.iter().zip(&files) {
        let table = schema
            .tables
            .iter()
            .find(|t| t.name == target.name)
            .ok_or_else(|| Error::TableNotInSchema {
                table: target.name.clone(),
            })?;

        let headers = build_headers(table);
        let selected: Vec<&Header> = headers
            .iter()
            .filter(|h| target.columns.iter().any(|c| c == &h.name))
            .collect();

        for column in &target.columns {
            if !selected.iter().any(|h| &h.name == column) {
                return Err(Error::ColumnNotFound {
                    table: target.name.clone(),
                    column: column.clone(),
                });
            }
        }

        let mut keys = KeyWidths::new();
        for (column, ref_table) in &target.refs {
            let width = widths.get(ref_table.as_str()).copied().ok_or_else(|| {
                Error::RefTableMissing {
                    table: ref_table.clone(),
                }
            })?;
            keys.set(column.clone(), width);
        }

        let mut columns = Vec::with_capacity(selected.len());
        for &header in &selected {
            debug!(table = %target.name, column = %header.name, "decoding column");
            columns.push((header.name.clone(), read_column(header, dat, &keys)?));
        }
        out.insert(target.name.clone(), materialize(dat.row_count, columns));
    }
    Ok(out)
}

/// Transpose named columns into row records, giving each row an `_index`.
/// Column order in each record follows the order given here, which the
/// exporter keeps aligned with header order.
pub fn materialize(row_count: usize, columns: Vec<(String, Vec<Value>)>) -> Vec<Record> {
    (0..row_count)
        .map(|row| {
            Record::new(
                row,
                columns
                    .iter()
                    .map(|(name, values)| (name.clone(), values[row].clone()))
                    .collect(),
            )
        })
        .collect()
}
