//! Synchronisation settings.

use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_parse};

/// Default catalog namespace owning every persisted entity.
pub const DEFAULT_NAMESPACE: &str = "service:prov:azure";

/// Default pricing API root.
pub const DEFAULT_PRICES_URL: &str = "https://azure.microsoft.com/api/v3/pricing";

/// Default hours in a billed month.
pub const DEFAULT_HOURS_PER_MONTH: f64 = 730.0;

/// Pattern used when an enablement option is not configured.
pub const MATCH_ALL: &str = ".*";

/// Enablement patterns, one per filtering axis.
///
/// Values are raw regular expressions; they are compiled (and validated) by
/// [`crate::enablement::EnablementPatterns::compile`] before any fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnablementConfig {
    pub regions: String,
    pub instance_types: String,
    pub os: String,
    pub database_types: String,
    pub database_engines: String,
}

impl Default for EnablementConfig {
    fn default() -> Self {
        Self {
            regions: MATCH_ALL.to_string(),
            instance_types: MATCH_ALL.to_string(),
            os: MATCH_ALL.to_string(),
            database_types: MATCH_ALL.to_string(),
            database_engines: MATCH_ALL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Catalog namespace (the owning node) of every persisted entity
    pub namespace: String,
    /// Root URL of the pricing API, without trailing slash
    pub prices_url: String,
    pub enablement: EnablementConfig,
    pub hours_per_month: f64,
    /// HTTP timeout per catalog document
    pub fetch_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            prices_url: DEFAULT_PRICES_URL.to_string(),
            enablement: EnablementConfig::default(),
            hours_per_month: DEFAULT_HOURS_PER_MONTH,
            fetch_timeout_secs: 60,
        }
    }
}

impl SyncConfig {
    /// Override the pricing API root (tests point it to a mock server)
    pub fn with_prices_url(mut self, url: impl Into<String>) -> Self {
        self.prices_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

impl FromEnv for SyncConfig {
    /// Environment variables:
    /// - `CATALOG_NAMESPACE` (default: `service:prov:azure`)
    /// - `CATALOG_PRICES_URL` (default: Azure v3 pricing API)
    /// - `CATALOG_REGIONS`, `CATALOG_INSTANCE_TYPES`, `CATALOG_OS`,
    ///   `CATALOG_DATABASE_TYPES`, `CATALOG_DATABASE_ENGINES` (default: `.*`)
    /// - `CATALOG_HOURS_PER_MONTH` (default: 730)
    /// - `CATALOG_FETCH_TIMEOUT_SECS` (default: 60)
    fn from_env() -> Result<Self, ConfigError> {
        let pattern = |key: &str| env_optional(key).unwrap_or_else(|| MATCH_ALL.to_string());

        let hours_per_month: f64 = env_parse("CATALOG_HOURS_PER_MONTH", "730")?;
        if !hours_per_month.is_finite() || hours_per_month <= 0.0 {
            return Err(ConfigError::ParseError {
                key: "CATALOG_HOURS_PER_MONTH".to_string(),
                details: format!("expected a positive number, got {hours_per_month}"),
            });
        }

        Ok(Self {
            namespace: env_or_default("CATALOG_NAMESPACE", DEFAULT_NAMESPACE),
            prices_url: env_or_default("CATALOG_PRICES_URL", DEFAULT_PRICES_URL)
                .trim_end_matches('/')
                .to_string(),
            enablement: EnablementConfig {
                regions: pattern("CATALOG_REGIONS"),
                instance_types: pattern("CATALOG_INSTANCE_TYPES"),
                os: pattern("CATALOG_OS"),
                database_types: pattern("CATALOG_DATABASE_TYPES"),
                database_engines: pattern("CATALOG_DATABASE_ENGINES"),
            },
            hours_per_month,
            fetch_timeout_secs: env_parse("CATALOG_FETCH_TIMEOUT_SECS", "60")?,
        })
    }
}
