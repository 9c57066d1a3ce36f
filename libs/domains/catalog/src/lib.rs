//! Catalog Domain
//!
//! Synchronises a cloud provider's published pricing catalog into normalized
//! entities, and reconciles it with the previously persisted catalog.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │ CatalogSync │  ← Run orchestration, fixed category order
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │  Importers  │  ← Fetch, decode, aggregate, upsert, purge
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Persistence (trait + implementations)
//! └─────────────┘
//! ```

pub mod catalog;
pub mod components;
pub mod config;
pub mod context;
pub mod cost;
pub mod decoder;
pub mod enablement;
pub mod entity;
pub mod error;
pub mod fetch;
pub mod importers;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod purge;
pub mod reference;
pub mod repository;
pub mod resolver;
pub mod sync;
pub mod upsert;

// Re-export commonly used types
pub use config::{EnablementConfig, SyncConfig};
pub use context::{CategoryStats, RunContext};
pub use error::{CatalogError, CatalogResult, ComponentError};
pub use fetch::{CatalogFetcher, HttpCatalogFetcher, StaticCatalogFetcher};
pub use memory::InMemoryCatalogRepository;
pub use models::{
    DatabasePrice, DatabaseType, EntityKind, InstancePrice, InstanceType, PriceTerm, Region,
    StoragePrice, StorageType, SupportPrice, SupportType,
};
pub use postgres::PgCatalogRepository;
pub use reference::ReferenceData;
pub use repository::{CatalogRecord, CatalogRepository};
pub use sync::{CatalogSync, SyncSummary};
