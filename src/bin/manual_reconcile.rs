// Small dev utility: reconcile the full cascade against a degraded one over a sample of order lines.
//
// Usage:
//   cargo run --bin manual_reconcile -- [db_path] [sample_csv] [degraded_types]
//
//   degraded_types: comma-separated pattern types the degraded context supports (default: exact)
//
// The report is printed to stdout as JSON; logs go to stderr.
// Set SKU_LOG_FORMAT=json for JSON log lines.

use anyhow::{anyhow, Context};
use sku_resolution::consistency::{ReconciliationCheck, ReconciliationSample};
use sku_resolution::engine::{CascadeProfile, NoOpEventPublisher, SnapshotStore};
use sku_resolution::importer::parse_samples_csv;
use sku_resolution::repository::SqliteReferenceSource;
use sku_resolution::{logging, ConfigManager, PatternType};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn default_db_path() -> String {
    dirs::data_local_dir()
        .map(|dir| dir.join("sku-resolution").join("sku_resolution.db"))
        .unwrap_or_else(|| PathBuf::from("sku_resolution.db"))
        .display()
        .to_string()
}

fn parse_pattern_types(raw: &str) -> anyhow::Result<Vec<PatternType>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| PatternType::parse(s).ok_or_else(|| anyhow!("unknown pattern type: {}", s)))
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match std::env::var("SKU_LOG_FORMAT") {
        Ok(format) if format.eq_ignore_ascii_case("json") => logging::init_json(),
        _ => logging::init(),
    }

    let mut args = std::env::args().skip(1);
    let db_path = args
        .next()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(default_db_path);
    let sample_csv = args
        .next()
        .context("missing sample_csv (columns: raw_sku,source,quantity[,revenue])")?;
    let degraded_types = parse_pattern_types(&args.next().unwrap_or_else(|| "exact".to_string()))?;

    // ConfigManager errors are Box<dyn Error> without Send + Sync
    let config = ConfigManager::new(&db_path)
        .map_err(|e| anyhow!("{}", e))?
        .load_resolver_config()
        .await
        .map_err(|e| anyhow!("{}", e))
        .with_context(|| format!("failed to load resolver config from {}", db_path))?;
    let source = SqliteReferenceSource::new(&db_path)
        .with_context(|| format!("failed to open reference tables in {}", db_path))?;
    let publisher = Arc::new(NoOpEventPublisher);
    let store = SnapshotStore::load(
        Arc::new(source),
        publisher.clone(),
        config.snapshot_options(),
        config.ttl(),
    )
    .context("failed to load reference snapshot")?;

    let parsed = parse_samples_csv(Path::new(&sample_csv))
        .with_context(|| format!("failed to parse {}", sample_csv))?;
    for issue in &parsed.report.issues {
        tracing::warn!(row = issue.row_number, field = %issue.field, "{}", issue.message);
    }
    let samples: Vec<ReconciliationSample> = parsed.records;

    let profile = CascadeProfile::degraded("manual_reconcile", degraded_types);
    let check = ReconciliationCheck::new(profile, config.thresholds(), publisher);
    let report = check.run(&store.current(), &samples);

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
