//! folio-engine - batch metadata compiler
//!
//! Reads a JSON array of metadata records, compiles each into an intake-sheet
//! row, and writes the table as CSV plus a population report as JSON.
//!
//! Startup order:
//! 1. Application config (`--config`, optional) and logging
//! 2. Root folder: CLI → `FOLIO_ROOT_FOLDER` → config → OS default
//! 3. Identifier pool from the root folder (or `--pool`), optional import
//! 4. Lookup tables and the publisher → imprint → tranche scope
//! 5. Batch run; Ctrl+C stops submitting further records

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use folio_common::config::{load_toml_config_or_default, RootFolderResolver, TomlConfig};
use folio_common::{ResolvedConfig, ScopedConfig};
use folio_engine::batch::BatchOrchestrator;
use folio_engine::pool::{parse_identifier_file, IdentifierPool, JsonFileStore};
use folio_engine::{CompilationPipeline, LookupTables, MetadataRecord};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for folio-engine
#[derive(Parser, Debug)]
#[command(name = "folio-engine")]
#[command(about = "Compile book metadata into distributor intake rows")]
#[command(version)]
struct Args {
    /// JSON file holding an array of metadata records
    #[arg(short, long)]
    input: PathBuf,

    /// CSV output table
    #[arg(short, long)]
    output: PathBuf,

    /// JSON population report
    #[arg(long)]
    report: PathBuf,

    /// Application config file (folio.toml)
    #[arg(short, long, env = "FOLIO_CONFIG")]
    config: Option<PathBuf>,

    /// Publisher/imprint/tranche scope file
    #[arg(short, long)]
    scope: Option<PathBuf>,

    /// Identifier pool file (default: <root>/identifier_pool.json)
    #[arg(long)]
    pool: Option<PathBuf>,

    /// Import identifiers from a text/CSV file before the run
    #[arg(long)]
    import_identifiers: Option<PathBuf>,

    /// Working folder
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Lookup table override file
    #[arg(long)]
    lookup_tables: Option<PathBuf>,

    /// Run without an identifier pool (identifiers only as supplied)
    #[arg(long)]
    no_pool: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = match &args.config {
        Some(path) => load_toml_config_or_default(path),
        None => TomlConfig::default(),
    };

    init_tracing(&toml_config)?;
    info!("Starting folio-engine {}", env!("CARGO_PKG_VERSION"));

    let root_folder = RootFolderResolver::new("folio-engine")
        .with_cli_arg(args.root_folder.clone())
        .with_toml_config(&toml_config)
        .resolve();
    info!("Root folder: {}", root_folder.display());

    // Identifier pool
    let pool = if args.no_pool {
        None
    } else {
        let pool_path = args
            .pool
            .clone()
            .unwrap_or_else(|| toml_config.pool_path(&root_folder));
        let pool = IdentifierPool::open(JsonFileStore::new(&pool_path))
            .with_context(|| format!("Failed to open identifier pool {}", pool_path.display()))?;

        if let Some(import_path) = &args.import_identifiers {
            import_identifiers(&pool, import_path)?;
        }

        let stats = pool.statistics();
        info!(
            pool = %pool_path.display(),
            total = stats.total,
            available = stats.available,
            assigned = stats.assigned,
            published = stats.published,
            "Identifier pool loaded"
        );
        if stats.available == 0 {
            warn!("Identifier pool has no available identifiers; records without one will be skipped");
        }
        Some(Arc::new(pool))
    };

    // Lookup tables
    let tables_path = args.lookup_tables.clone().or_else(|| toml_config.lookup_tables.clone());
    let tables = match &tables_path {
        Some(path) => LookupTables::load(path)
            .with_context(|| format!("Failed to load lookup tables {}", path.display()))?,
        None => LookupTables::builtin(),
    };

    // Scope
    let mut resolved = match &args.scope {
        Some(path) => ScopedConfig::load(path)
            .with_context(|| format!("Failed to load scope file {}", path.display()))?
            .resolve(),
        None => ResolvedConfig::default(),
    };
    if let Some(max) = toml_config.max_parallel_records {
        resolved
            .settings
            .entry("max_parallel_records".to_string())
            .or_insert_with(|| max.to_string());
    }

    let records = read_records(&args.input)?;

    let mut pipeline = CompilationPipeline::from_config(resolved, tables);
    if let Some(pool) = pool {
        pipeline = pipeline.with_pool(pool);
    }
    let orchestrator = BatchOrchestrator::new(pipeline);

    let cancel_token = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel_token.clone()));

    let result = orchestrator.run(records, &cancel_token).await;

    result
        .table
        .write_csv(&args.output)
        .with_context(|| format!("Failed to write output table {}", args.output.display()))?;
    result
        .report
        .write_json(&args.report)
        .with_context(|| format!("Failed to write population report {}", args.report.display()))?;

    info!(
        output = %args.output.display(),
        report = %args.report.display(),
        "{}",
        result.report.summary()
    );
    Ok(())
}

/// `RUST_LOG`, else the config's `[logging] level`; optional log file
fn init_tracing(config: &TomlConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let file_layer = match &config.logging.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

fn import_identifiers(pool: &IdentifierPool, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read identifier file {}", path.display()))?;
    let identifiers = parse_identifier_file(&content)?;
    let stats = pool
        .import_batch(&identifiers)
        .context("Failed to import identifiers")?;
    info!(
        file = %path.display(),
        imported = stats.imported,
        duplicates = stats.duplicates_skipped,
        invalid = stats.invalid_skipped,
        "Identifiers imported"
    );
    Ok(())
}

fn read_records(path: &Path) -> Result<Vec<MetadataRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input {}", path.display()))?;
    let records: Vec<MetadataRecord> = serde_json::from_str(&content)
        .with_context(|| format!("Input {} is not a JSON array of objects", path.display()))?;
    info!(records = records.len(), "Input loaded");
    Ok(records)
}

async fn cancel_on_ctrl_c(cancel_token: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            warn!("Received Ctrl+C; finishing records in flight");
            cancel_token.cancel();
        }
        Err(e) => warn!("Cannot listen for Ctrl+C: {}", e),
    }
}
