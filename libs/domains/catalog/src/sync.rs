//! Synchronisation run orchestration.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use sea_orm::Iterable;
use serde::Serialize;
use tracing::{info, instrument};

use crate::config::SyncConfig;
use crate::context::{CategoryStats, RunContext};
use crate::enablement::EnablementPatterns;
use crate::error::CatalogResult;
use crate::fetch::CatalogFetcher;
use crate::importers::{CatalogImporter, ImportEnv, default_importers};
use crate::models::EntityKind;
use crate::reference::ReferenceData;
use crate::repository::CatalogRepository;

/// Result of a synchronisation run
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub namespace: String,
    pub force: bool,
    /// Price counters by category
    pub categories: BTreeMap<&'static str, CategoryStats>,
    /// Persisted entities by kind after the run
    pub totals: BTreeMap<EntityKind, usize>,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// Runs every category importer against one catalog namespace.
pub struct CatalogSync {
    config: SyncConfig,
    fetcher: Arc<dyn CatalogFetcher>,
    store: Arc<dyn CatalogRepository>,
    reference: Arc<ReferenceData>,
    importers: Vec<Box<dyn CatalogImporter>>,
}

impl CatalogSync {
    pub fn new(
        config: SyncConfig,
        fetcher: Arc<dyn CatalogFetcher>,
        store: Arc<dyn CatalogRepository>,
        reference: Arc<ReferenceData>,
    ) -> Self {
        Self {
            config,
            fetcher,
            store,
            reference,
            importers: default_importers(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run one synchronisation.
    ///
    /// Patterns are compiled before any fetch. An I/O failure stops the run
    /// at the failing category; the categories before it stay committed.
    #[instrument(skip(self), fields(namespace = %self.config.namespace))]
    pub async fn sync(&self, force: bool) -> CatalogResult<SyncSummary> {
        let start = Instant::now();
        let patterns = EnablementPatterns::compile(&self.config.enablement)?;
        let mut context = RunContext::new(
            self.config.namespace.clone(),
            force,
            self.config.hours_per_month,
            patterns,
        );
        let env = ImportEnv {
            fetcher: self.fetcher.as_ref(),
            store: self.store.as_ref(),
            reference: self.reference.as_ref(),
        };

        for importer in &self.importers {
            info!(category = importer.name(), "Starting catalog import");
            importer.install(&env, &mut context).await?;
        }

        let summary = SyncSummary {
            namespace: self.config.namespace.clone(),
            force,
            categories: context.stats,
            totals: self.status().await?,
            duration_ms: start.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        };
        info!(duration_ms = summary.duration_ms, "Catalog synchronised");
        Ok(summary)
    }

    /// Persisted entities by kind.
    pub async fn status(&self) -> CatalogResult<BTreeMap<EntityKind, usize>> {
        let mut totals = BTreeMap::new();
        for kind in EntityKind::iter() {
            totals.insert(kind, self.store.count(&self.config.namespace, kind).await?);
        }
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnablementConfig;
    use crate::error::CatalogError;
    use crate::fetch::MockCatalogFetcher;
    use crate::memory::InMemoryCatalogRepository;

    #[tokio::test]
    async fn test_invalid_pattern_fails_before_any_fetch() {
        let mut fetcher = MockCatalogFetcher::new();
        fetcher.expect_fetch().times(0);
        let config = SyncConfig {
            enablement: EnablementConfig {
                regions: "europe-(".to_string(),
                ..EnablementConfig::default()
            },
            ..SyncConfig::default()
        };
        let sync = CatalogSync::new(
            config,
            Arc::new(fetcher),
            Arc::new(InMemoryCatalogRepository::new()),
            Arc::new(ReferenceData::bundled().unwrap()),
        );

        let error = sync.sync(false).await.unwrap_err();
        assert!(matches!(error, CatalogError::Pattern { ref key, .. } if key == "regions"));
    }

    #[tokio::test]
    async fn test_status_counts_every_kind() {
        let sync = CatalogSync::new(
            SyncConfig::default(),
            Arc::new(crate::fetch::StaticCatalogFetcher::new()),
            Arc::new(InMemoryCatalogRepository::new()),
            Arc::new(ReferenceData::bundled().unwrap()),
        );
        let totals = sync.status().await.unwrap();
        assert_eq!(totals.len(), 10);
        assert!(totals.values().all(|count| *count == 0));
    }
}
