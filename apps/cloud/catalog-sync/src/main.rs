//! Catalog Sync
//!
//! Imports the published pricing catalog into the quoting database.
//! Can run as a one-shot synchronisation or as a scheduled cron job.

use clap::{Parser, Subcommand};
use core_config::Environment;
use core_config::tracing::{init_tracing, install_color_eyre};
use eyre::Result;
use tracing::info;

mod collector;
mod config;
mod db;
mod telemetry;

use collector::CatalogCollector;
use config::Config;

#[derive(Parser)]
#[command(name = "catalog-sync")]
#[command(about = "Synchronise the cloud pricing catalog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a one-time synchronisation
    Sync {
        /// Rewrite every entity, even the unchanged ones
        #[arg(short, long)]
        force: bool,
    },

    /// Run as a scheduled service
    Schedule {
        /// Cron expression for scheduling (default: daily at 03:00)
        #[arg(short, long, default_value = "0 0 3 * * *")]
        cron: String,
    },

    /// Show persisted entity counts
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    let environment = Environment::from_env();
    init_tracing(&environment);

    // Initialize metrics
    telemetry::init_metrics(config.metrics_addr)?;

    let cli = Cli::parse();

    info!("Connecting to database...");
    let db = db::connect_with_retry(config.database.clone()).await?;
    db::run_migrations(&db).await?;

    let collector = CatalogCollector::new(db, config)?;

    match cli.command {
        Commands::Sync { force } => {
            info!(force, "Starting one-time catalog synchronisation");
            let summary = collector.sync(force).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Schedule { cron } => {
            info!("Starting scheduled synchronisation with cron: {}", cron);
            collector.run_scheduled(&cron).await?;
        }

        Commands::Status => {
            let status = collector.status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}
