//! Sea-ORM entities of the catalog tables.

/// One persisted catalog entity, any kind.
pub mod catalog_entry {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    use crate::models::EntityKind;
    use crate::repository::CatalogRecord;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "catalog_entries")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        #[sea_orm(column_type = "String(StringLen::N(255))")]
        pub namespace: String,
        pub kind: EntityKind,
        #[sea_orm(column_type = "String(StringLen::N(512))")]
        pub code: String,
        #[sea_orm(column_type = "String(StringLen::N(100))", nullable)]
        pub region: Option<String>,
        #[sea_orm(column_type = "String(StringLen::N(100))", nullable)]
        pub term: Option<String>,
        /// Typed entity, JSON-encoded
        #[sea_orm(column_type = "JsonBinary")]
        pub payload: Json,
        pub created_at: DateTimeWithTimeZone,
        pub updated_at: DateTimeWithTimeZone,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl From<Model> for CatalogRecord {
        fn from(model: Model) -> Self {
            Self {
                kind: model.kind,
                code: model.code,
                region: model.region,
                term: model.term,
                payload: model.payload,
            }
        }
    }
}

/// Quote line referencing a catalog price.
pub mod quote_price_ref {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "quote_price_refs")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        #[sea_orm(column_type = "String(StringLen::N(255))")]
        pub quote_line: String,
        pub entry_id: Uuid,
        pub created_at: DateTimeWithTimeZone,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
