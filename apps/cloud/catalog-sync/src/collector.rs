//! Catalog Sync Service
//!
//! Wires the synchronisation engine to PostgreSQL and the pricing API.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain_catalog::{
    CatalogSync, EntityKind, HttpCatalogFetcher, PgCatalogRepository, ReferenceData, SyncSummary,
};
use eyre::Result;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::Config;
use crate::telemetry;

/// Persisted catalog at a point in time
#[derive(Debug, Clone, Serialize)]
pub struct CatalogStatus {
    pub namespace: String,
    pub prices_url: String,
    pub totals: BTreeMap<EntityKind, usize>,
    pub timestamp: DateTime<Utc>,
}

/// Main catalog sync service
#[derive(Clone)]
pub struct CatalogCollector {
    engine: Arc<CatalogSync>,
    /// Runs of the same namespace never overlap
    running: Arc<Mutex<()>>,
}

impl CatalogCollector {
    pub fn new(db: DatabaseConnection, config: Config) -> Result<Self> {
        let sync = config.sync;
        let fetcher = HttpCatalogFetcher::from_config(&sync)?;
        let engine = CatalogSync::new(
            sync,
            Arc::new(fetcher),
            Arc::new(PgCatalogRepository::new(db)),
            Arc::new(ReferenceData::bundled()?),
        );
        Ok(Self {
            engine: Arc::new(engine),
            running: Arc::new(Mutex::new(())),
        })
    }

    /// Run a one-time synchronisation
    pub async fn sync(&self, force: bool) -> Result<SyncSummary> {
        let _guard = self.running.lock().await;
        let summary = match self.engine.sync(force).await {
            Ok(summary) => summary,
            Err(e) => {
                telemetry::record_failure();
                return Err(e.into());
            }
        };
        telemetry::record_summary(&summary);
        for (category, stats) in &summary.categories {
            info!(
                category,
                created = stats.created,
                updated = stats.updated,
                unchanged = stats.unchanged,
                skipped = stats.skipped,
                purged = stats.purged,
                "Category synchronised"
            );
        }
        Ok(summary)
    }

    pub async fn status(&self) -> Result<CatalogStatus> {
        let config = self.engine.config();
        Ok(CatalogStatus {
            namespace: config.namespace.clone(),
            prices_url: config.prices_url.clone(),
            totals: self.engine.status().await?,
            timestamp: Utc::now(),
        })
    }

    /// Run as a scheduled service
    pub async fn run_scheduled(&self, cron_expr: &str) -> Result<()> {
        info!(cron = cron_expr, "Starting scheduled catalog synchronisation");

        let mut sched = JobScheduler::new().await?;
        let collector = self.clone();

        let job = Job::new_async(cron_expr, move |_uuid, _l| {
            let collector = collector.clone();

            Box::pin(async move {
                info!("Running scheduled catalog synchronisation");
                match collector.sync(false).await {
                    Ok(summary) => {
                        info!(
                            duration_ms = summary.duration_ms,
                            "Scheduled synchronisation complete"
                        );
                    }
                    Err(e) => {
                        error!(error = %e, "Scheduled synchronisation failed");
                    }
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Scheduler started, waiting for jobs...");
        tokio::signal::ctrl_c().await?;
        info!("Shutting down scheduler");
        sched.shutdown().await?;
        Ok(())
    }
}
