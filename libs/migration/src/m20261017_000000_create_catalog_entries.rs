use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

const KINDS: [EntryKind; 10] = [
    EntryKind::Region,
    EntryKind::PriceTerm,
    EntryKind::InstanceType,
    EntryKind::DatabaseType,
    EntryKind::StorageType,
    EntryKind::SupportType,
    EntryKind::InstancePrice,
    EntryKind::DatabasePrice,
    EntryKind::StoragePrice,
    EntryKind::SupportPrice,
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(EntryKind::Enum)
                    .values(KINDS)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CatalogEntries::Table)
                    .if_not_exists()
                    .col(pk_uuid(CatalogEntries::Id))
                    .col(string_len(CatalogEntries::Namespace, 255))
                    .col(
                        ColumnDef::new(CatalogEntries::Kind)
                            .enumeration(EntryKind::Enum, KINDS)
                            .not_null(),
                    )
                    .col(string_len(CatalogEntries::Code, 512))
                    .col(string_len_null(CatalogEntries::Region, 100))
                    .col(string_len_null(CatalogEntries::Term, 100))
                    .col(json_binary(CatalogEntries::Payload).default("{}"))
                    .col(
                        timestamp_with_time_zone(CatalogEntries::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(CatalogEntries::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Natural key of every entity
        manager
            .create_index(
                Index::create()
                    .name("idx_catalog_entries_namespace_kind_code")
                    .table(CatalogEntries::Table)
                    .col(CatalogEntries::Namespace)
                    .col(CatalogEntries::Kind)
                    .col(CatalogEntries::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Price lookups by location and term
        manager
            .create_index(
                Index::create()
                    .name("idx_catalog_entries_region")
                    .table(CatalogEntries::Table)
                    .col(CatalogEntries::Region)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_catalog_entries_term")
                    .table(CatalogEntries::Table)
                    .col(CatalogEntries::Term)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(QuotePriceRefs::Table)
                    .if_not_exists()
                    .col(pk_uuid(QuotePriceRefs::Id))
                    .col(string_len(QuotePriceRefs::QuoteLine, 255))
                    .col(uuid(QuotePriceRefs::EntryId))
                    .col(
                        timestamp_with_time_zone(QuotePriceRefs::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quote_price_refs_entry")
                            .from(QuotePriceRefs::Table, QuotePriceRefs::EntryId)
                            .to(CatalogEntries::Table, CatalogEntries::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_quote_price_refs_entry_id")
                    .table(QuotePriceRefs::Table)
                    .col(QuotePriceRefs::EntryId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QuotePriceRefs::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(CatalogEntries::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(EntryKind::Enum).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum CatalogEntries {
    Table,
    Id,
    Namespace,
    Kind,
    Code,
    Region,
    Term,
    Payload,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum QuotePriceRefs {
    Table,
    Id,
    QuoteLine,
    EntryId,
    CreatedAt,
}

#[derive(DeriveIden, Clone, Copy)]
enum EntryKind {
    #[sea_orm(iden = "catalog_entry_kind")]
    Enum,
    #[sea_orm(iden = "region")]
    Region,
    #[sea_orm(iden = "price_term")]
    PriceTerm,
    #[sea_orm(iden = "instance_type")]
    InstanceType,
    #[sea_orm(iden = "database_type")]
    DatabaseType,
    #[sea_orm(iden = "storage_type")]
    StorageType,
    #[sea_orm(iden = "support_type")]
    SupportType,
    #[sea_orm(iden = "instance_price")]
    InstancePrice,
    #[sea_orm(iden = "database_price")]
    DatabasePrice,
    #[sea_orm(iden = "storage_price")]
    StoragePrice,
    #[sea_orm(iden = "support_price")]
    SupportPrice,
}
