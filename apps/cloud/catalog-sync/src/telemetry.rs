//! Prometheus metrics for synchronisation runs.

use std::net::SocketAddr;
use std::time::Duration;

use domain_catalog::SyncSummary;
use eyre::Result;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

/// Install the Prometheus recorder, exposed over HTTP when `listen` is set.
pub fn init_metrics(listen: Option<SocketAddr>) -> Result<()> {
    match listen {
        Some(addr) => {
            PrometheusBuilder::new().with_http_listener(addr).install()?;
            info!(%addr, "Prometheus exporter listening");
        }
        None => {
            PrometheusBuilder::new().install_recorder()?;
            info!("Prometheus metrics recorder initialized");
        }
    }
    register_metric_descriptions();
    Ok(())
}

fn register_metric_descriptions() {
    describe_counter!(
        "catalog_sync_runs_total",
        "Synchronisation runs by status"
    );
    describe_counter!(
        "catalog_sync_prices_total",
        "Price outcomes by category and outcome"
    );
    describe_histogram!(
        "catalog_sync_duration_seconds",
        "Synchronisation run duration in seconds"
    );
}

/// Record the counters of a completed run.
pub fn record_summary(summary: &SyncSummary) {
    counter!("catalog_sync_runs_total", "status" => "success").increment(1);
    for (category, stats) in &summary.categories {
        let outcomes = [
            ("created", stats.created),
            ("updated", stats.updated),
            ("unchanged", stats.unchanged),
            ("skipped", stats.skipped),
            ("purged", stats.purged),
        ];
        for (outcome, count) in outcomes {
            counter!("catalog_sync_prices_total", "category" => *category, "outcome" => outcome)
                .increment(count as u64);
        }
    }
    histogram!("catalog_sync_duration_seconds")
        .record(Duration::from_millis(summary.duration_ms).as_secs_f64());
}

pub fn record_failure() {
    counter!("catalog_sync_runs_total", "status" => "error").increment(1);
}
