//! Per-run state.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::enablement::EnablementPatterns;
use crate::models::{
    DatabasePrice, DatabaseType, InstancePrice, InstanceType, PriceTerm, Region, StoragePrice,
    StorageType, SupportPrice, SupportType,
};
use crate::upsert::{EntityCache, SaveOutcome};

/// Counters of one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Entries rejected by decoding or filtering
    pub skipped: usize,
    pub purged: usize,
}

impl CategoryStats {
    pub fn record(&mut self, outcome: SaveOutcome) {
        match outcome {
            SaveOutcome::Created => self.created += 1,
            SaveOutcome::Updated => self.updated += 1,
            SaveOutcome::Unchanged => self.unchanged += 1,
        }
    }

    pub fn skip(&mut self) {
        self.skipped += 1;
    }
}

/// State owned by exactly one synchronisation run.
///
/// Caches are loaded lazily by the first importer needing a kind, then
/// shared by the following importers of the same run.
#[derive(Debug)]
pub struct RunContext {
    pub namespace: String,
    pub force: bool,
    pub hours_per_month: f64,
    pub patterns: EnablementPatterns,
    /// Catalog region names, filled by every fetched document
    pub region_names: BTreeMap<String, String>,

    pub regions: EntityCache<Region>,
    pub terms: EntityCache<PriceTerm>,
    pub instance_types: EntityCache<InstanceType>,
    pub database_types: EntityCache<DatabaseType>,
    pub storage_types: EntityCache<StorageType>,
    pub support_types: EntityCache<SupportType>,
    pub instance_prices: EntityCache<InstancePrice>,
    pub database_prices: EntityCache<DatabasePrice>,
    pub storage_prices: EntityCache<StoragePrice>,
    pub support_prices: EntityCache<SupportPrice>,

    /// Price counters by category name
    pub stats: BTreeMap<&'static str, CategoryStats>,
}

impl RunContext {
    pub fn new(
        namespace: impl Into<String>,
        force: bool,
        hours_per_month: f64,
        patterns: EnablementPatterns,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            force,
            hours_per_month,
            patterns,
            region_names: BTreeMap::new(),
            regions: EntityCache::new(),
            terms: EntityCache::new(),
            instance_types: EntityCache::new(),
            database_types: EntityCache::new(),
            storage_types: EntityCache::new(),
            support_types: EntityCache::new(),
            instance_prices: EntityCache::new(),
            database_prices: EntityCache::new(),
            storage_prices: EntityCache::new(),
            support_prices: EntityCache::new(),
            stats: BTreeMap::new(),
        }
    }

    pub fn stats_mut(&mut self, category: &'static str) -> &mut CategoryStats {
        self.stats.entry(category).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_count_outcomes() {
        let mut context = RunContext::new("ns", false, 730.0, EnablementPatterns::default());
        let stats = context.stats_mut("compute");
        stats.record(SaveOutcome::Created);
        stats.record(SaveOutcome::Unchanged);
        stats.skip();
        assert_eq!(
            context.stats["compute"],
            CategoryStats {
                created: 1,
                unchanged: 1,
                skipped: 1,
                ..CategoryStats::default()
            }
        );
    }

    #[test]
    fn test_contexts_do_not_share_caches() {
        let mut first = RunContext::new("a", false, 730.0, EnablementPatterns::default());
        let second = RunContext::new("b", false, 730.0, EnablementPatterns::default());
        first.regions.ensure_descriptive("europe-north", |_| {});
        assert!(first.regions.contains("europe-north"));
        assert!(!second.regions.contains("europe-north"));
    }
}
