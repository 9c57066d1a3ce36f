use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entity::catalog_entry::{ActiveModel, Column, Entity};
use crate::entity::quote_price_ref;
use crate::error::CatalogResult;
use crate::models::EntityKind;
use crate::repository::{CatalogRecord, CatalogRepository};

/// Codes per `IN (...)` clause when purging.
const DELETE_CHUNK: usize = 500;

/// PostgreSQL implementation of CatalogRepository
#[derive(Clone)]
pub struct PgCatalogRepository {
    db: DatabaseConnection,
}

impl PgCatalogRepository {
    /// Create a new PostgreSQL catalog repository
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn find_all(
        &self,
        namespace: &str,
        kind: EntityKind,
    ) -> CatalogResult<Vec<CatalogRecord>> {
        let results = Entity::find()
            .filter(Column::Namespace.eq(namespace))
            .filter(Column::Kind.eq(kind))
            .order_by_asc(Column::Code)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(results)
    }

    async fn save(&self, namespace: &str, record: CatalogRecord) -> CatalogResult<()> {
        let now = chrono::Utc::now();
        let existing = Entity::find()
            .filter(Column::Namespace.eq(namespace))
            .filter(Column::Kind.eq(record.kind))
            .filter(Column::Code.eq(record.code.as_str()))
            .one(&self.db)
            .await?;

        if let Some(existing) = existing {
            let mut model: ActiveModel = existing.into();
            model.region = Set(record.region);
            model.term = Set(record.term);
            model.payload = Set(record.payload);
            model.updated_at = Set(now.into());
            model.update(&self.db).await?;
        } else {
            let model = ActiveModel {
                id: Set(Uuid::now_v7()),
                namespace: Set(namespace.to_string()),
                kind: Set(record.kind),
                code: Set(record.code),
                region: Set(record.region),
                term: Set(record.term),
                payload: Set(record.payload),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            };
            model.insert(&self.db).await?;
        }
        Ok(())
    }

    async fn delete(
        &self,
        namespace: &str,
        kind: EntityKind,
        codes: &[String],
    ) -> CatalogResult<usize> {
        if codes.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin().await?;
        let mut deleted = 0;
        for chunk in codes.chunks(DELETE_CHUNK) {
            let ids: Vec<Uuid> = Entity::find()
                .select_only()
                .column(Column::Id)
                .filter(Column::Namespace.eq(namespace))
                .filter(Column::Kind.eq(kind))
                .filter(Column::Code.is_in(chunk.iter().map(String::as_str)))
                .into_tuple()
                .all(&txn)
                .await?;
            if ids.is_empty() {
                continue;
            }

            // Quote lines first, they reference the entries
            quote_price_ref::Entity::delete_many()
                .filter(quote_price_ref::Column::EntryId.is_in(ids.clone()))
                .exec(&txn)
                .await?;
            let result = Entity::delete_many()
                .filter(Column::Id.is_in(ids))
                .exec(&txn)
                .await?;
            deleted += result.rows_affected as usize;
        }
        txn.commit().await?;
        Ok(deleted)
    }

    async fn count(&self, namespace: &str, kind: EntityKind) -> CatalogResult<usize> {
        let count = Entity::find()
            .filter(Column::Namespace.eq(namespace))
            .filter(Column::Kind.eq(kind))
            .count(&self.db)
            .await?;
        Ok(count as usize)
    }
}
