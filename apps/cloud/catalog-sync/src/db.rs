//! PostgreSQL connection and schema setup.

use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tracing::{info, warn};

use crate::config::DatabaseConfig;

const INITIAL_RETRY_DELAY_MS: u64 = 200;
const MAX_RETRY_DELAY_MS: u64 = 5000;

fn connect_options(config: &DatabaseConfig) -> ConnectOptions {
    let mut opt = ConnectOptions::new(&config.url);
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .sqlx_logging(config.sqlx_logging);
    opt
}

/// Connect with exponential backoff between attempts.
pub async fn connect_with_retry(config: DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let options = connect_options(&config);
    let mut delay = INITIAL_RETRY_DELAY_MS;
    let mut attempt = 0;

    loop {
        match Database::connect(options.clone()).await {
            Ok(db) => {
                info!(attempt, "Successfully connected to PostgreSQL database");
                return Ok(db);
            }
            Err(e) => {
                attempt += 1;
                if attempt > config.connect_retries {
                    warn!(attempts = attempt, error = %e, "Database connection failed");
                    return Err(e);
                }
                warn!(attempt, delay_ms = delay, error = %e, "Database connection failed, retrying");
                tokio::time::sleep(Duration::from_millis(delay)).await;
                delay = (delay * 2).min(MAX_RETRY_DELAY_MS);
            }
        }
    }
}

/// Bring the catalog schema up to date.
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    info!("Running catalog database migrations...");
    Migrator::up(db, None).await?;
    info!("Migrations completed successfully");
    Ok(())
}
