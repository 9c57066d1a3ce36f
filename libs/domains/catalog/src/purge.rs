//! Removal of prices the current run did not confirm.

use tracing::info;

use crate::error::CatalogResult;
use crate::repository::CatalogRepository;
use crate::upsert::{CatalogEntity, EntityCache};

/// Delete every previously persisted entity of `cache` left unconfirmed.
///
/// Quote lines referencing a deleted price are removed with it by the store.
pub async fn purge_stale<T: CatalogEntity>(
    cache: &mut EntityCache<T>,
    store: &dyn CatalogRepository,
    namespace: &str,
) -> CatalogResult<usize> {
    purge_stale_where(cache, store, namespace, |_| true).await
}

/// Like [`purge_stale`], restricted to the entities `select` accepts.
///
/// Stale rows whose payload could not be decoded are always selected.
pub async fn purge_stale_where<T, F>(
    cache: &mut EntityCache<T>,
    store: &dyn CatalogRepository,
    namespace: &str,
    select: F,
) -> CatalogResult<usize>
where
    T: CatalogEntity,
    F: Fn(&T) -> bool,
{
    let stale: Vec<String> = cache
        .stale_codes()
        .into_iter()
        .filter(|code| cache.get(code).is_none_or(&select))
        .collect();
    if stale.is_empty() {
        return Ok(0);
    }

    let kind = T::KIND;
    let deleted = store.delete(namespace, kind, &stale).await?;
    cache.remove_all(&stale);
    info!(%kind, stale = stale.len(), deleted, "Purged stale entries");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::Cost;
    use crate::memory::InMemoryCatalogRepository;
    use crate::models::{DatabasePrice, EntityKind};
    use crate::repository::MockCatalogRepository;
    use crate::upsert::upsert_price;

    fn price(code: &str, engine: &str) -> DatabasePrice {
        DatabasePrice {
            code: code.to_string(),
            region: "europe-north".to_string(),
            term: "payg".to_string(),
            engine: engine.to_string(),
            ..DatabasePrice::default()
        }
    }

    #[tokio::test]
    async fn test_unconfirmed_prices_are_deleted() {
        let store = InMemoryCatalogRepository::new();
        let mut cache = EntityCache::<DatabasePrice>::new();
        for code in ["a", "b"] {
            upsert_price(&mut cache, code, |_| {}, &Cost::monthly(1.0, 0), &store, "ns", false)
                .await
                .unwrap();
        }
        store.add_quote_reference("line-1", "ns", EntityKind::DatabasePrice, "b");

        // Next run only confirms "a"
        let mut cache = EntityCache::<DatabasePrice>::new();
        cache.ensure_loaded(&store, "ns").await.unwrap();
        cache.ensure_descriptive("a", |_| {});
        cache.record_cost("a", &Cost::monthly(1.0, 0)).unwrap();

        let deleted = purge_stale(&mut cache, &store, "ns").await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.codes("ns", EntityKind::DatabasePrice), vec!["a".to_string()]);
        assert!(store.quote_references().is_empty());
        assert!(!cache.contains("b"));
    }

    #[tokio::test]
    async fn test_selection_keeps_other_entities() {
        let store = InMemoryCatalogRepository::new();
        let mut cache = EntityCache::<DatabasePrice>::new();
        cache.load([price("mysql-price", "MYSQL"), price("sql-price", "SQL SERVER")]);

        let deleted = purge_stale_where(&mut cache, &store, "ns", |p| p.engine == "MYSQL")
            .await
            .unwrap();
        assert_eq!(deleted, 0);
        assert_eq!(cache.stale_codes(), vec!["sql-price".to_string()]);
    }

    #[tokio::test]
    async fn test_nothing_stale_skips_the_store() {
        let mut store = MockCatalogRepository::new();
        store.expect_delete().times(0);
        let mut cache = EntityCache::<DatabasePrice>::new();
        assert_eq!(purge_stale(&mut cache, &store, "ns").await.unwrap(), 0);
    }
}
