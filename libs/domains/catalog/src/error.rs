use core_config::ConfigError;
use thiserror::Error;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that stop a category or the whole synchronisation run.
///
/// Entry-level problems (a dangling offer reference, an unknown dimension)
/// never surface here; see [`ComponentError`].
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Invalid or unparsable configuration value
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An enablement pattern or decoder rule that does not compile
    #[error("Invalid pattern for '{key}': {source}")]
    Pattern {
        key: String,
        #[source]
        source: regex::Error,
    },

    /// Raw transport failure while fetching a catalog document
    #[error("Failed to fetch catalog document '{path}': {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// A fetched body that is not a catalog document at all
    #[error("Malformed catalog document '{path}': {source}")]
    Document {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Bundled reference data that cannot be read
    #[error("Invalid reference data '{name}': {details}")]
    Reference { name: String, details: String },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Entity payload (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Recoverable decode failure of a single SKU/term component list.
///
/// Any of these invalidates only the price entry being installed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    #[error("component list is not an array of strings")]
    InvalidList,

    #[error("invalid component reference '{0}'")]
    InvalidShape(String),

    #[error("unknown offer reference '{0}'")]
    UnknownOffer(String),

    #[error("unknown dimension '{dimension}' in offer '{offer}'")]
    UnknownDimension { offer: String, dimension: String },

    #[error("no component resolves a type")]
    UnresolvedType,
}
