// src/schema/fetch.rs

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{debug, info, instrument};

use crate::error::Error;

use super::types::{SchemaFile, SCHEMA_URL, SCHEMA_VERSION};

/// Download and parse the published schema document.
#[instrument(level = "info", skip(client))]
pub async fn fetch_schema(client: &Client) -> Result<SchemaFile> {
    debug!("fetching schema from {}", SCHEMA_URL);
    let schema: SchemaFile = client
        .get(SCHEMA_URL)
        .send()
        .await
        .with_context(|| format!("GET {} failed", SCHEMA_URL))?
        .error_for_status()
        .context("non-success status for schema document")?
        .json()
        .await
        .context("parsing schema document")?;
    info!(
        version = schema.version,
        tables = schema.tables.len(),
        "schema loaded"
    );
    Ok(schema)
}

/// Gate the whole run on the document's version marker. Runs before any
/// table bytes are requested.
pub fn ensure_compatible(schema: &SchemaFile) -> crate::error::Result<()> {
    if schema.version != SCHEMA_VERSION {
        return Err(Error::SchemaIncompatible {
            found: schema.version,
            expected: SCHEMA_VERSION,
        });
    }
    Ok(())
}
