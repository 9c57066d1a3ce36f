//! Idempotent upsert primitive.
//!
//! [`EntityCache`] holds, for one entity kind, the entities persisted before
//! the run and those touched during it. Descriptive attributes are merged
//! once per run and code ([`EntityCache::ensure_descriptive`]); costs are
//! applied on every occurrence ([`EntityCache::record_cost`]). A write only
//! reaches the store when the entity differs from its persisted state, or
//! when the run is forced.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::cost::Cost;
use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    DatabasePrice, DatabaseType, EntityKind, InstancePrice, InstanceType, PriceTerm, Region,
    StoragePrice, StorageType, SupportPrice, SupportType,
};
use crate::repository::{CatalogRecord, CatalogRepository};

/// An entity addressed by a natural code.
pub trait CatalogEntity:
    Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: EntityKind;

    /// Blank entity carrying only its code
    fn with_code(code: &str) -> Self;

    fn code(&self) -> &str;

    fn region(&self) -> Option<&str> {
        None
    }

    fn term(&self) -> Option<&str> {
        None
    }

    fn to_record(&self) -> CatalogResult<CatalogRecord> {
        Ok(CatalogRecord {
            kind: Self::KIND,
            code: self.code().to_string(),
            region: self.region().map(str::to_string),
            term: self.term().map(str::to_string),
            payload: serde_json::to_value(self)?,
        })
    }

    fn from_record(record: &CatalogRecord) -> CatalogResult<Self> {
        Ok(serde_json::from_value(record.payload.clone())?)
    }
}

/// An entity carrying cost fields.
pub trait PricedEntity: CatalogEntity {
    fn apply_cost(&mut self, cost: &Cost);
}

/// Result of [`EntityCache::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Per-run cache of one entity kind.
#[derive(Debug, Clone)]
pub struct EntityCache<T> {
    entries: BTreeMap<String, T>,
    /// State of each entity in the store
    persisted: BTreeMap<String, T>,
    /// Codes present in the store when the run started
    previous: BTreeSet<String>,
    /// Codes whose descriptive attributes were merged this run
    merged: BTreeSet<String>,
    /// Codes confirmed by the remote catalog this run
    valid: BTreeSet<String>,
    loaded: bool,
}

impl<T> Default for EntityCache<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            persisted: BTreeMap::new(),
            previous: BTreeSet::new(),
            merged: BTreeSet::new(),
            valid: BTreeSet::new(),
            loaded: false,
        }
    }
}

impl<T: CatalogEntity> EntityCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cache with previously persisted entities.
    pub fn load(&mut self, entities: impl IntoIterator<Item = T>) {
        for entity in entities {
            let code = entity.code().to_string();
            self.previous.insert(code.clone());
            self.persisted.insert(code.clone(), entity.clone());
            self.entries.insert(code, entity);
        }
        self.loaded = true;
    }

    /// Load this kind from the store, once per run.
    ///
    /// Rows whose payload no longer decodes are kept as purge candidates only.
    pub async fn ensure_loaded(
        &mut self,
        store: &dyn CatalogRepository,
        namespace: &str,
    ) -> CatalogResult<()> {
        if self.loaded {
            return Ok(());
        }
        let kind = T::KIND;
        let records = store.find_all(namespace, kind).await?;
        let mut entities = Vec::with_capacity(records.len());
        for record in &records {
            match T::from_record(record) {
                Ok(entity) => entities.push(entity),
                Err(error) => {
                    warn!(%kind, code = %record.code, %error, "Undecodable payload");
                    self.previous.insert(record.code.clone());
                }
            }
        }
        debug!(%kind, count = entities.len(), "Loaded persisted entities");
        self.load(entities);
        Ok(())
    }

    pub fn get(&self, code: &str) -> Option<&T> {
        self.entries.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    /// Whether descriptive attributes of `code` were merged this run.
    pub fn is_merged(&self, code: &str) -> bool {
        self.merged.contains(code)
    }

    /// Find or create `code`, merging descriptive attributes on first touch
    /// this run only.
    pub fn ensure_descriptive<F>(&mut self, code: &str, merge: F) -> &T
    where
        F: FnOnce(&mut T),
    {
        let entity = self
            .entries
            .entry(code.to_string())
            .or_insert_with(|| T::with_code(code));
        if self.merged.insert(code.to_string()) {
            merge(entity);
        }
        entity
    }

    /// Mark `code` as confirmed by this run.
    pub fn confirm(&mut self, code: &str) {
        self.valid.insert(code.to_string());
    }

    pub fn is_confirmed(&self, code: &str) -> bool {
        self.valid.contains(code)
    }

    /// Persist `code` when it changed since its last write, or always when
    /// `force` is set.
    pub async fn save(
        &mut self,
        code: &str,
        store: &dyn CatalogRepository,
        namespace: &str,
        force: bool,
    ) -> CatalogResult<SaveOutcome> {
        let entity = self.entries.get(code).ok_or_else(|| {
            CatalogError::Internal(format!("{} '{code}' saved before creation", T::KIND))
        })?;
        let outcome = match self.persisted.get(code) {
            None => SaveOutcome::Created,
            Some(persisted) if persisted != entity => SaveOutcome::Updated,
            Some(_) => SaveOutcome::Unchanged,
        };
        if outcome != SaveOutcome::Unchanged || force {
            store.save(namespace, entity.to_record()?).await?;
            self.persisted.insert(code.to_string(), entity.clone());
        }
        Ok(outcome)
    }

    /// Codes persisted before the run and not confirmed during it.
    pub fn stale_codes(&self) -> Vec<String> {
        self.previous.difference(&self.valid).cloned().collect()
    }

    /// Forget purged codes.
    pub fn remove_all(&mut self, codes: &[String]) {
        for code in codes {
            self.entries.remove(code);
            self.persisted.remove(code);
            self.previous.remove(code);
            self.merged.remove(code);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }
}

impl<T: PricedEntity> EntityCache<T> {
    /// Write cost fields of an existing entity, regardless of the merge
    /// guard, and confirm its code.
    pub fn record_cost(&mut self, code: &str, cost: &Cost) -> CatalogResult<&T> {
        let entity = self.entries.get_mut(code).ok_or_else(|| {
            CatalogError::Internal(format!("cost recorded for unknown {} '{code}'", T::KIND))
        })?;
        entity.apply_cost(cost);
        self.valid.insert(code.to_string());
        Ok(entity)
    }
}

/// Find-or-create a descriptive entity and persist it when it changed.
pub async fn upsert_entity<T, F>(
    cache: &mut EntityCache<T>,
    code: &str,
    merge: F,
    store: &dyn CatalogRepository,
    namespace: &str,
    force: bool,
) -> CatalogResult<SaveOutcome>
where
    T: CatalogEntity,
    F: FnOnce(&mut T),
{
    cache.ensure_descriptive(code, merge);
    cache.confirm(code);
    cache.save(code, store, namespace, force).await
}

/// Find-or-create a price, merge it once, record its cost and persist it.
pub async fn upsert_price<T, F>(
    cache: &mut EntityCache<T>,
    code: &str,
    merge: F,
    cost: &Cost,
    store: &dyn CatalogRepository,
    namespace: &str,
    force: bool,
) -> CatalogResult<SaveOutcome>
where
    T: PricedEntity,
    F: FnOnce(&mut T),
{
    cache.ensure_descriptive(code, merge);
    cache.record_cost(code, cost)?;
    cache.save(code, store, namespace, force).await
}

macro_rules! coded_entity {
    ($entity:ty, $kind:expr) => {
        impl CatalogEntity for $entity {
            const KIND: EntityKind = $kind;

            fn with_code(code: &str) -> Self {
                Self {
                    code: code.to_string(),
                    ..Self::default()
                }
            }

            fn code(&self) -> &str {
                &self.code
            }
        }
    };
}

coded_entity!(Region, EntityKind::Region);
coded_entity!(PriceTerm, EntityKind::PriceTerm);
coded_entity!(InstanceType, EntityKind::InstanceType);
coded_entity!(DatabaseType, EntityKind::DatabaseType);
coded_entity!(StorageType, EntityKind::StorageType);
coded_entity!(SupportType, EntityKind::SupportType);
coded_entity!(SupportPrice, EntityKind::SupportPrice);

impl CatalogEntity for InstancePrice {
    const KIND: EntityKind = EntityKind::InstancePrice;

    fn with_code(code: &str) -> Self {
        Self {
            code: code.to_string(),
            ..Self::default()
        }
    }

    fn code(&self) -> &str {
        &self.code
    }

    fn region(&self) -> Option<&str> {
        Some(&self.region)
    }

    fn term(&self) -> Option<&str> {
        Some(&self.term)
    }
}

impl PricedEntity for InstancePrice {
    fn apply_cost(&mut self, cost: &Cost) {
        self.cost = cost.monthly;
        self.cost_period = cost.period;
    }
}

impl CatalogEntity for DatabasePrice {
    const KIND: EntityKind = EntityKind::DatabasePrice;

    fn with_code(code: &str) -> Self {
        Self {
            code: code.to_string(),
            ..Self::default()
        }
    }

    fn code(&self) -> &str {
        &self.code
    }

    fn region(&self) -> Option<&str> {
        Some(&self.region)
    }

    fn term(&self) -> Option<&str> {
        Some(&self.term)
    }
}

impl PricedEntity for DatabasePrice {
    fn apply_cost(&mut self, cost: &Cost) {
        self.cost = cost.monthly;
        self.cost_period = cost.period;
    }
}

impl CatalogEntity for StoragePrice {
    const KIND: EntityKind = EntityKind::StoragePrice;

    fn with_code(code: &str) -> Self {
        Self {
            code: code.to_string(),
            ..Self::default()
        }
    }

    fn code(&self) -> &str {
        &self.code
    }

    fn region(&self) -> Option<&str> {
        Some(&self.region)
    }
}

impl PricedEntity for StoragePrice {
    fn apply_cost(&mut self, cost: &Cost) {
        self.cost = cost.monthly;
        self.cost_gb = cost.per_gb.unwrap_or_default();
        self.cost_transaction = cost.transaction.unwrap_or_default();
    }
}

impl PricedEntity for SupportPrice {
    fn apply_cost(&mut self, cost: &Cost) {
        self.cost = cost.monthly;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockCatalogRepository;

    fn price(code: &str, cost: f64) -> InstancePrice {
        InstancePrice {
            code: code.to_string(),
            region: "europe-north".to_string(),
            term: "payg".to_string(),
            cost,
            cost_period: cost,
            ..InstancePrice::default()
        }
    }

    #[test]
    fn test_merge_runs_once_per_code() {
        let mut cache = EntityCache::<InstanceType>::new();
        let mut merges = 0;
        cache.ensure_descriptive("ds4v2", |t| {
            merges += 1;
            t.cpu = 8.0;
        });
        cache.ensure_descriptive("ds4v2", |t| {
            merges += 1;
            t.cpu = 1.0;
        });
        assert_eq!(merges, 1);
        assert_eq!(cache.get("ds4v2").unwrap().cpu, 8.0);
    }

    #[test]
    fn test_loaded_entity_is_merged_again_in_a_new_run() {
        let mut cache = EntityCache::<InstanceType>::new();
        cache.load([InstanceType {
            code: "ds4v2".to_string(),
            name: "old".to_string(),
            ..InstanceType::default()
        }]);
        cache.ensure_descriptive("ds4v2", |t| t.name = "DS4 v2".to_string());
        assert_eq!(cache.get("ds4v2").unwrap().name, "DS4 v2");
    }

    #[test]
    fn test_cost_is_recorded_on_every_occurrence() {
        let mut cache = EntityCache::<InstancePrice>::new();
        cache.ensure_descriptive("europe-north/payg/linux-ds4v2-standard", |_| {});
        cache
            .record_cost("europe-north/payg/linux-ds4v2-standard", &Cost::monthly(10.0, 0))
            .unwrap();
        let price = cache
            .record_cost("europe-north/payg/linux-ds4v2-standard", &Cost::monthly(12.0, 0))
            .unwrap();
        assert_eq!(price.cost, 12.0);
        assert!(cache.is_confirmed("europe-north/payg/linux-ds4v2-standard"));
    }

    #[test]
    fn test_record_cost_requires_existing_entity() {
        let mut cache = EntityCache::<InstancePrice>::new();
        assert!(cache.record_cost("missing", &Cost::monthly(1.0, 0)).is_err());
    }

    #[test]
    fn test_stale_codes() {
        let mut cache = EntityCache::<InstancePrice>::new();
        cache.load([price("a", 1.0), price("b", 2.0)]);
        cache.ensure_descriptive("a", |_| {});
        cache.record_cost("a", &Cost::monthly(1.0, 0)).unwrap();
        assert_eq!(cache.stale_codes(), vec!["b".to_string()]);

        let stale = cache.stale_codes();
        cache.remove_all(&stale);
        assert!(cache.stale_codes().is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_save_skips_unchanged_entities() {
        let mut store = MockCatalogRepository::new();
        store.expect_save().times(0);

        let mut cache = EntityCache::<InstancePrice>::new();
        cache.load([price("a", 1.0)]);
        cache.ensure_descriptive("a", |_| {});
        cache.record_cost("a", &Cost::monthly(1.0, 0)).unwrap();

        let outcome = cache.save("a", &store, "ns", false).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_save_writes_changes_once() {
        let mut store = MockCatalogRepository::new();
        store
            .expect_save()
            .withf(|ns, record| {
                ns == "ns" && record.code == "a" && record.payload["cost"] == 2.0
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let mut cache = EntityCache::<InstancePrice>::new();
        cache.load([price("a", 1.0)]);
        cache.ensure_descriptive("a", |_| {});
        cache.record_cost("a", &Cost::monthly(2.0, 0)).unwrap();

        assert_eq!(
            cache.save("a", &store, "ns", false).await.unwrap(),
            SaveOutcome::Updated
        );
        assert_eq!(
            cache.save("a", &store, "ns", false).await.unwrap(),
            SaveOutcome::Unchanged
        );
    }

    #[tokio::test]
    async fn test_force_rewrites_unchanged_entities() {
        let mut store = MockCatalogRepository::new();
        store.expect_save().times(1).returning(|_, _| Ok(()));

        let mut cache = EntityCache::<InstancePrice>::new();
        cache.load([price("a", 1.0)]);
        cache.ensure_descriptive("a", |_| {});
        cache.record_cost("a", &Cost::monthly(1.0, 0)).unwrap();

        let outcome = cache.save("a", &store, "ns", true).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let mut store = MockCatalogRepository::new();
        store
            .expect_save()
            .returning(|_, _| Err(CatalogError::Internal("connection reset".to_string())));

        let mut cache = EntityCache::<Region>::new();
        let result = upsert_entity(&mut cache, "europe-north", |_| {}, &store, "ns", false).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_ensure_loaded_reads_the_store_once() {
        let mut store = MockCatalogRepository::new();
        store
            .expect_find_all()
            .withf(|ns, kind| ns == "ns" && *kind == EntityKind::Region)
            .times(1)
            .returning(|_, _| {
                Ok(vec![CatalogRecord {
                    kind: EntityKind::Region,
                    code: "europe-north".to_string(),
                    region: None,
                    term: None,
                    payload: serde_json::json!({"code": "europe-north", "description": null}),
                }])
            });

        let mut cache = EntityCache::<Region>::new();
        cache.ensure_loaded(&store, "ns").await.unwrap();
        cache.ensure_loaded(&store, "ns").await.unwrap();
        assert!(cache.contains("europe-north"));
    }

    #[test]
    fn test_price_record_exposes_region_and_term() {
        let record = price("europe-north/payg/a", 1.0).to_record().unwrap();
        assert_eq!(record.kind, EntityKind::InstancePrice);
        assert_eq!(record.region.as_deref(), Some("europe-north"));
        assert_eq!(record.term.as_deref(), Some("payg"));
        let back = InstancePrice::from_record(&record).unwrap();
        assert_eq!(back.code, "europe-north/payg/a");
    }
}
