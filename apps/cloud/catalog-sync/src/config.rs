//! Configuration for the catalog sync service

use std::net::SocketAddr;

use core_config::{ConfigError, FromEnv, env_optional, env_parse, env_required};
use domain_catalog::SyncConfig;

/// PostgreSQL pool settings
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    /// Database connection URL (required)
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
    /// Enable SQL query logging
    pub sqlx_logging: bool,
    /// Connection attempts before giving up
    pub connect_retries: u32,
}

impl FromEnv for DatabaseConfig {
    /// Environment variables:
    /// - `DATABASE_URL` (required)
    /// - `DB_MAX_CONNECTIONS` (default: 10)
    /// - `DB_MIN_CONNECTIONS` (default: 1)
    /// - `DB_CONNECT_TIMEOUT_SECS` (default: 8)
    /// - `DB_ACQUIRE_TIMEOUT_SECS` (default: 8)
    /// - `DB_SQLX_LOGGING` (default: false)
    /// - `DB_CONNECT_RETRIES` (default: 3)
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env_required("DATABASE_URL")?,
            max_connections: env_parse("DB_MAX_CONNECTIONS", "10")?,
            min_connections: env_parse("DB_MIN_CONNECTIONS", "1")?,
            connect_timeout_secs: env_parse("DB_CONNECT_TIMEOUT_SECS", "8")?,
            acquire_timeout_secs: env_parse("DB_ACQUIRE_TIMEOUT_SECS", "8")?,
            sqlx_logging: env_parse("DB_SQLX_LOGGING", "false")?,
            connect_retries: env_parse("DB_CONNECT_RETRIES", "3")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    /// Prometheus exporter address (`METRICS_ADDR`), none to keep metrics in-process
    pub metrics_addr: Option<SocketAddr>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database: DatabaseConfig::from_env()?,
            sync: SyncConfig::from_env()?,
            metrics_addr: metrics_addr()?,
        })
    }
}

fn metrics_addr() -> Result<Option<SocketAddr>, ConfigError> {
    env_optional("METRICS_ADDR")
        .map(|value| {
            value.parse::<SocketAddr>().map_err(|e| ConfigError::ParseError {
                key: "METRICS_ADDR".to_string(),
                details: format!("{e}"),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_url_is_required() {
        temp_env::with_var_unset("DATABASE_URL", || {
            let err = Config::from_env().unwrap_err();
            assert_eq!(err, ConfigError::MissingEnvVar("DATABASE_URL".to_string()));
        });
    }

    #[test]
    fn test_pool_defaults() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgresql://localhost/catalog")),
                ("DB_MAX_CONNECTIONS", None),
                ("DB_CONNECT_RETRIES", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.database.url, "postgresql://localhost/catalog");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.database.connect_retries, 3);
                assert!(!config.database.sqlx_logging);
            },
        );
    }

    #[test]
    fn test_metrics_address() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgresql://localhost/catalog")),
                ("METRICS_ADDR", Some("0.0.0.0:9000")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.metrics_addr, Some("0.0.0.0:9000".parse::<SocketAddr>().unwrap()));
            },
        );
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgresql://localhost/catalog")),
                ("METRICS_ADDR", None),
            ],
            || assert_eq!(Config::from_env().unwrap().metrics_addr, None),
        );
    }

    #[test]
    fn test_invalid_metrics_address_names_the_key() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgresql://localhost/catalog")),
                ("METRICS_ADDR", Some("port nine thousand")),
            ],
            || {
                let err = Config::from_env().unwrap_err();
                assert!(err.to_string().contains("METRICS_ADDR"));
            },
        );
    }

    #[test]
    fn test_invalid_pool_size_names_the_key() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgresql://localhost/catalog")),
                ("DB_MAX_CONNECTIONS", Some("lots")),
            ],
            || {
                let err = Config::from_env().unwrap_err();
                assert!(err.to_string().contains("DB_MAX_CONNECTIONS"));
            },
        );
    }
}
