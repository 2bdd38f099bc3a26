// gadi command line entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::config::Settings;
use common::db::repositories::LawRepository;
use common::db::DbPool;
use common::export::generate_bulk_law_files;
use common::gii::{GiiClient, LocalDirectory};
use common::ingest::{download_laws, ingest_data_from_location};
use common::schemas::load_all_laws;
use common::telemetry;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "gadi", about = "German federal law data ingestion", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply database migrations
    Migrate,
    /// Download new and updated laws from gesetze-im-internet.de
    Download,
    /// Load downloaded laws into the database
    Ingest,
    /// Write JSON files for all laws
    Export {
        /// Output directory (defaults to the configured export dir)
        dir: Option<PathBuf>,
    },
    /// Download, ingest and export in one go
    Update,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().context("Failed to load configuration")?;
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    telemetry::init_logging(&settings.observability.log_level, settings.observability.json_logs)?;
    let metrics_handle = telemetry::init_metrics()?;

    let records_metrics = matches!(cli.command, Command::Download | Command::Ingest | Command::Update);
    let result = run(cli.command, &settings).await;

    // Written on failure too
    if records_metrics {
        let path = Path::new(&settings.observability.metrics_file);
        if let Err(e) = telemetry::write_metrics_textfile(&metrics_handle, path) {
            warn!(error = %format!("{:#}", e), "Failed to write metrics");
        }
    }

    if let Err(e) = result {
        error!(error = %format!("{:#}", e), "Command failed");
        return Err(e);
    }
    Ok(())
}

async fn run(command: Command, settings: &Settings) -> Result<()> {
    match command {
        Command::Migrate => {
            let pool = connect(settings).await?;
            pool.migrate().await.context("Failed to apply migrations")?;
            pool.close().await;
        }
        Command::Download => download(settings).await?,
        Command::Ingest => ingest(settings).await?,
        Command::Export { dir } => {
            let dir = dir.unwrap_or_else(|| PathBuf::from(&settings.storage.export_dir));
            export(settings, &dir).await?;
        }
        Command::Update => {
            download(settings).await?;
            ingest(settings).await?;
            export(settings, Path::new(&settings.storage.export_dir)).await?;
        }
    }
    Ok(())
}

async fn connect(settings: &Settings) -> Result<DbPool> {
    DbPool::new(&settings.database)
        .await
        .context("Failed to connect to database")
}

async fn download(settings: &Settings) -> Result<()> {
    info!(data_dir = %settings.storage.data_dir, "Downloading laws");
    let location = LocalDirectory::new(&settings.storage.data_dir);
    let source = GiiClient::new(&settings.gii).context("Failed to create HTTP client")?;

    let summary = download_laws(&location, &source, settings.gii.max_removals)
        .await
        .context("Download failed")?;
    info!(
        new = summary.new,
        updated = summary.updated,
        removed = summary.removed,
        "Download complete"
    );
    Ok(())
}

async fn ingest(settings: &Settings) -> Result<()> {
    info!(data_dir = %settings.storage.data_dir, "Ingesting laws");
    let pool = connect(settings).await?;
    let repository = LawRepository::new(pool.clone());
    let location = LocalDirectory::new(&settings.storage.data_dir);

    let result = ingest_data_from_location(&repository, &location, settings.gii.max_removals).await;
    pool.close().await;

    let summary = result.context("Ingest failed")?;
    info!(
        new = summary.new,
        updated = summary.updated,
        removed = summary.removed,
        failed = summary.failed.len(),
        slugs_fixed = summary.slugs_fixed,
        "Ingest complete"
    );
    Ok(())
}

async fn export(settings: &Settings, dir: &Path) -> Result<()> {
    info!(dir = %dir.display(), "Exporting laws");
    let pool = connect(settings).await?;
    let repository = LawRepository::new(pool.clone());

    let laws = load_all_laws(&repository).await;
    pool.close().await;
    let laws = laws.context("Failed to load laws")?;

    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    generate_bulk_law_files(&laws, dir).context("Export failed")?;
    info!(count = laws.len(), "Export complete");
    Ok(())
}
