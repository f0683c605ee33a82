// src/report/mod.rs

use std::path::Path;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::dat::{Record, Value};

/// Stat slots a mod row carries.
const STAT_SLOTS: usize = 4;

/// One stat binding: which stat, and its roll range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatRange {
    pub id: String,
    pub min: i64,
    pub max: i64,
}

/// Derived per-mod summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModSummary {
    pub id: String,
    pub name: String,
    pub weight: i64,
    pub stats: Vec<Option<StatRange>>,
}

/// A mod row that could not be summarized, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct DeriveFailure {
    pub row: usize,
    pub reason: String,
}

/// Result of a derivation run: everything that worked and everything that
/// didn't, as data. One bad row never aborts the rest.
#[derive(Debug, Default)]
pub struct DeriveOutcome {
    pub summaries: Vec<ModSummary>,
    pub failures: Vec<DeriveFailure>,
}

/// Join each mod row against the stats table.
#[instrument(level = "info", skip_all, fields(mods = mods.len(), stats = stats.len()))]
pub fn derive_mod_summaries(mods: &[Record], stats: &[Record]) -> DeriveOutcome {
    let mut outcome = DeriveOutcome::default();
    for record in mods {
        match summarize(record, stats) {
            Ok(summary) => outcome.summaries.push(summary),
            Err(reason) => {
                warn!(row = record.index(), %reason, "skipping mod row");
                outcome.failures.push(DeriveFailure {
                    row: record.index(),
                    reason,
                });
            }
        }
    }
    info!(
        ok = outcome.summaries.len(),
        failed = outcome.failures.len(),
        "derived mod summaries"
    );
    outcome
}

fn summarize(record: &Record, stats: &[Record]) -> std::result::Result<ModSummary, String> {
    let id = text_field(record, "Id")?;
    let name = text_field(record, "Name")?;

    let weight = match record.get("SpawnWeight_Values") {
        Some(Value::Array(values)) => values.first().and_then(Value::as_int).unwrap_or(0),
        _ => 0,
    };

    let mut slots = Vec::with_capacity(STAT_SLOTS);
    for slot in 1..=STAT_SLOTS {
        let key = match record.get(&format!("StatsKey{slot}")) {
            Some(Value::Key(row)) => *row,
            Some(Value::Null) | None => {
                slots.push(None);
                continue;
            }
            Some(other) => return Err(format!("StatsKey{slot} is not a key: {other:?}")),
        };
        let stat = stats.get(key as usize).ok_or_else(|| {
            format!(
                "StatsKey{slot} points at row {key}, but the stats table has {} rows",
                stats.len()
            )
        })?;
        slots.push(Some(StatRange {
            id: text_field(stat, "Id")?,
            min: int_field(record, &format!("Stat{slot}Min"))?,
            max: int_field(record, &format!("Stat{slot}Max"))?,
        }));
    }
    // keep interior gaps explicit, drop unused tail slots
    while matches!(slots.last(), Some(None)) {
        slots.pop();
    }

    Ok(ModSummary {
        id,
        name,
        weight,
        stats: slots,
    })
}

fn text_field(record: &Record, name: &str) -> std::result::Result<String, String> {
    record
        .get(name)
        .and_then(Value::as_text)
        .map(str::to_owned)
        .ok_or_else(|| format!("missing or non-text field \"{name}\""))
}

fn int_field(record: &Record, name: &str) -> std::result::Result<i64, String> {
    record
        .get(name)
        .and_then(Value::as_int)
        .ok_or_else(|| format!("missing or non-integer field \"{name}\""))
}

/// Write the finished report as one pretty-printed JSON array. Nothing is
/// written until the whole run has succeeded.
pub async fn write_report(path: impl AsRef<Path>, summaries: &[ModSummary]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(summaries)?;
    tokio::fs::write(path.as_ref(), json).await?;
    info!(
        path = %path.as_ref().display(),
        count = summaries.len(),
        "report written"
    );
    Ok(())
}
