use async_trait::async_trait;
use serde_json::Value;

use crate::error::CatalogResult;
use crate::models::EntityKind;

/// A persisted catalog entity, addressed by `(namespace, kind, code)`.
///
/// `region` and `term` duplicate payload fields so the quoting side can
/// query prices without decoding payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRecord {
    pub kind: EntityKind,
    pub code: String,
    pub region: Option<String>,
    pub term: Option<String>,
    pub payload: Value,
}

/// Repository trait for catalog persistence
///
/// Implementations can use different storage backends (PostgreSQL, memory).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// All entities of a kind in a namespace
    async fn find_all(&self, namespace: &str, kind: EntityKind)
    -> CatalogResult<Vec<CatalogRecord>>;

    /// Insert or update by natural code
    async fn save(&self, namespace: &str, record: CatalogRecord) -> CatalogResult<()>;

    /// Delete entities by code, with the quote references pointing to them.
    ///
    /// Returns the number of deleted entities.
    async fn delete(&self, namespace: &str, kind: EntityKind, codes: &[String])
    -> CatalogResult<usize>;

    /// Count entities of a kind
    async fn count(&self, namespace: &str, kind: EntityKind) -> CatalogResult<usize>;
}
