//! Catalog document retrieval.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::error::{CatalogError, CatalogResult};

/// Body standing for a missing document.
pub const EMPTY_DOCUMENT: &str = "{}";

/// Source of raw catalog documents, addressed by path suffix.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogFetcher: Send + Sync {
    /// Raw body of the document at `path`.
    ///
    /// A document the server does not deliver is [`EMPTY_DOCUMENT`]; only raw
    /// transport failures are errors.
    async fn fetch(&self, path: &str) -> CatalogResult<String>;
}

/// Fetches documents over HTTP from a base URL.
#[derive(Debug, Clone)]
pub struct HttpCatalogFetcher {
    client: Client,
    base_url: String,
}

impl HttpCatalogFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> CatalogResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| CatalogError::Transport {
                path: String::new(),
                source,
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetcher for the configured pricing API root and timeout.
    pub fn from_config(config: &SyncConfig) -> CatalogResult<Self> {
        Self::new(
            config.prices_url.clone(),
            Duration::from_secs(config.fetch_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CatalogFetcher for HttpCatalogFetcher {
    async fn fetch(&self, path: &str) -> CatalogResult<String> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "Fetching catalog document");

        let transport = |source| CatalogError::Transport {
            path: path.to_string(),
            source,
        };
        let response = self.client.get(&url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "Catalog document unavailable, using an empty document");
            return Ok(EMPTY_DOCUMENT.to_string());
        }

        let body = response.text().await.map_err(transport)?;
        if body.trim().is_empty() {
            warn!(%url, "Empty catalog document");
            return Ok(EMPTY_DOCUMENT.to_string());
        }
        Ok(body)
    }
}

/// Serves canned documents; unknown paths are empty documents.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogFetcher {
    documents: BTreeMap<String, String>,
}

impl StaticCatalogFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, path: impl Into<String>, body: impl Into<String>) -> Self {
        self.documents.insert(path.into(), body.into());
        self
    }
}

#[async_trait]
impl CatalogFetcher for StaticCatalogFetcher {
    async fn fetch(&self, path: &str) -> CatalogResult<String> {
        Ok(self
            .documents
            .get(path)
            .cloned()
            .unwrap_or_else(|| EMPTY_DOCUMENT.to_string()))
    }
}
