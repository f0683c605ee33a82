use anyhow::Result;
use datscraper::{
    bundle::CdnFileSource,
    export::{export_tables, ExportConfig, TableExport},
    patch,
    report::{derive_mod_summaries, write_report},
    schema,
};
use reqwest::Client;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,datscraper=info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    // ─── 2) discover the current release ─────────────────────────────
    let version = patch::discover_version(patch::PATCH_SERVER).await?;
    info!(%version, "current release");

    // ─── 3) content source, cached on disk ───────────────────────────
    let client = Client::new();
    let source = CdnFileSource::new(client.clone(), &version, PathBuf::from(".cache"))?;

    // ─── 4) schema, gated on version before any table bytes ──────────
    let schema = schema::fetch_schema(&client).await?;
    schema::ensure_compatible(&schema)?;

    // ─── 5) export tables ────────────────────────────────────────────
    let config = mods_export_config();
    let tables = export_tables(&config, &schema, &source).await?;

    // ─── 6) derive the report ────────────────────────────────────────
    let mods = tables.get("Mods").map(Vec::as_slice).unwrap_or_default();
    let stats = tables.get("Stats").map(Vec::as_slice).unwrap_or_default();
    let outcome = derive_mod_summaries(mods, stats);
    for failure in &outcome.failures {
        error!(row = failure.row, reason = %failure.reason, "mod row skipped");
    }

    // ─── 7) write it once, at the end ────────────────────────────────
    write_report("mods.json", &outcome.summaries).await?;

    info!("all done");
    Ok(())
}

fn mods_export_config() -> ExportConfig {
    let mod_refs: HashMap<String, String> = (1..=4)
        .map(|slot| (format!("StatsKey{slot}"), "Stats".to_string()))
        .chain([("Families".to_string(), "ModFamily".to_string())])
        .collect();

    ExportConfig {
        tables: vec![
            TableExport {
                name: "Mods".to_string(),
                columns: [
                    "Id",
                    "Name",
                    "StatsKey1",
                    "StatsKey2",
                    "StatsKey3",
                    "StatsKey4",
                    "Domain",
                    "Families",
                    "Stat1Min",
                    "Stat1Max",
                    "Stat2Min",
                    "Stat2Max",
                    "Stat3Min",
                    "Stat3Max",
                    "Stat4Min",
                    "Stat4Max",
                    "SpawnWeight_Values",
                ]
                .map(String::from)
                .to_vec(),
                refs: mod_refs,
            },
            TableExport {
                name: "Stats".to_string(),
                columns: vec!["Id".to_string()],
                refs: HashMap::new(),
            },
            TableExport {
                name: "ModFamily".to_string(),
                columns: vec!["Id".to_string()],
                refs: HashMap::new(),
            },
        ],
    }
}
