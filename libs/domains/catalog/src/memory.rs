//! In-memory catalog store, used by tests and dry runs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::CatalogResult;
use crate::models::EntityKind;
use crate::repository::{CatalogRecord, CatalogRepository};

type Key = (String, EntityKind, String);

#[derive(Debug, Default)]
struct State {
    records: BTreeMap<Key, CatalogRecord>,
    /// Quote line id to referenced price key
    quote_refs: BTreeMap<String, Key>,
    writes: usize,
}

#[derive(Debug, Default)]
pub struct InMemoryCatalogRepository {
    state: Mutex<State>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reference a price from a quote line.
    pub fn add_quote_reference(
        &self,
        quote_line: &str,
        namespace: &str,
        kind: EntityKind,
        code: &str,
    ) {
        self.lock().quote_refs.insert(
            quote_line.to_string(),
            (namespace.to_string(), kind, code.to_string()),
        );
    }

    pub fn quote_references(&self) -> BTreeSet<String> {
        self.lock().quote_refs.keys().cloned().collect()
    }

    pub fn get(&self, namespace: &str, kind: EntityKind, code: &str) -> Option<CatalogRecord> {
        self.lock()
            .records
            .get(&(namespace.to_string(), kind, code.to_string()))
            .cloned()
    }

    pub fn codes(&self, namespace: &str, kind: EntityKind) -> Vec<String> {
        self.lock()
            .records
            .keys()
            .filter(|(ns, k, _)| ns == namespace && *k == kind)
            .map(|(_, _, code)| code.clone())
            .collect()
    }

    pub fn count_kind(&self, namespace: &str, kind: EntityKind) -> usize {
        self.codes(namespace, kind).len()
    }

    /// Every record, ordered by key.
    pub fn snapshot(&self) -> Vec<CatalogRecord> {
        self.lock().records.values().cloned().collect()
    }

    /// Number of `save` calls served so far.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn find_all(
        &self,
        namespace: &str,
        kind: EntityKind,
    ) -> CatalogResult<Vec<CatalogRecord>> {
        Ok(self
            .lock()
            .records
            .iter()
            .filter(|((ns, k, _), _)| ns == namespace && *k == kind)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn save(&self, namespace: &str, record: CatalogRecord) -> CatalogResult<()> {
        let mut state = self.lock();
        state.writes += 1;
        state.records.insert(
            (namespace.to_string(), record.kind, record.code.clone()),
            record,
        );
        Ok(())
    }

    async fn delete(
        &self,
        namespace: &str,
        kind: EntityKind,
        codes: &[String],
    ) -> CatalogResult<usize> {
        let mut state = self.lock();
        let keys: BTreeSet<Key> = codes
            .iter()
            .map(|code| (namespace.to_string(), kind, code.clone()))
            .collect();
        state.quote_refs.retain(|_, key| !keys.contains(key));
        let before = state.records.len();
        state.records.retain(|key, _| !keys.contains(key));
        Ok(before - state.records.len())
    }

    async fn count(&self, namespace: &str, kind: EntityKind) -> CatalogResult<usize> {
        Ok(self.count_kind(namespace, kind))
    }
}
