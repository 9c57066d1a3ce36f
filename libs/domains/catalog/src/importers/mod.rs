//! Category importers, run in a fixed order by [`crate::sync::CatalogSync`].

mod base;
mod database;
mod disk;
mod support;
mod vm;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

pub use base::BaseImporter;
pub use database::{DATABASE_ENGINES, DatabaseEngine, DatabaseImporter};
pub use disk::{DISK_PATH, DiskImporter};
pub use support::SupportImporter;
pub use vm::{COMPUTE_PATH, DEDICATED_TYPES, VmImporter};

use crate::catalog::{CatalogDocument, parse_document};
use crate::context::RunContext;
use crate::error::CatalogResult;
use crate::fetch::CatalogFetcher;
use crate::reference::ReferenceData;
use crate::repository::CatalogRepository;
use crate::resolver::resolve_region;

/// Category names used in run statistics.
pub const CATEGORY_REGION: &str = "region";
pub const CATEGORY_COMPUTE: &str = "compute";
pub const CATEGORY_DATABASE: &str = "database";
pub const CATEGORY_STORAGE: &str = "storage";
pub const CATEGORY_SUPPORT: &str = "support";

/// Collaborators shared by every importer of a run.
pub struct ImportEnv<'a> {
    pub fetcher: &'a dyn CatalogFetcher,
    pub store: &'a dyn CatalogRepository,
    pub reference: &'a ReferenceData,
}

/// One catalog category.
#[async_trait]
pub trait CatalogImporter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch, decode and reconcile this category.
    ///
    /// Entry-level decode failures are logged and skipped; only I/O and
    /// configuration errors are returned.
    async fn install(&self, env: &ImportEnv<'_>, context: &mut RunContext) -> CatalogResult<()>;
}

/// Importers in run order.
pub fn default_importers() -> Vec<Box<dyn CatalogImporter>> {
    vec![
        Box::new(BaseImporter),
        Box::new(VmImporter),
        Box::new(DatabaseImporter),
        Box::new(DiskImporter),
        Box::new(SupportImporter),
    ]
}

/// Fetch and parse one document.
pub(crate) async fn fetch_document<T>(env: &ImportEnv<'_>, path: &str) -> CatalogResult<T>
where
    T: DeserializeOwned + Default,
{
    let body = env.fetcher.fetch(path).await?;
    debug!(path, bytes = body.len(), "Fetched catalog document");
    parse_document(path, &body)
}

/// Lookups shared by the term resolution of a document.
pub(crate) struct TermNames {
    pub tiers: BTreeMap<String, String>,
    pub billing: BTreeMap<String, String>,
}

/// Install the enabled regions a document lists and build its name lookups.
pub(crate) async fn prepare_document(
    env: &ImportEnv<'_>,
    context: &mut RunContext,
    document: &CatalogDocument,
) -> CatalogResult<TermNames> {
    for region in &document.regions {
        if !context.patterns.is_enabled_region(&region.id) {
            continue;
        }
        if !region.name.is_empty() {
            context
                .region_names
                .insert(region.id.clone(), region.name.clone());
        }
        resolve_region(context, env.store, env.reference, &region.id).await?;
    }
    Ok(TermNames {
        tiers: document.tiers_by_id(),
        billing: document.billing_by_id(),
    })
}

/// `<region>[/byol]/<local code>`
pub(crate) fn price_code(region: &str, byol: bool, local_code: &str) -> String {
    if byol {
        format!("{region}/byol/{local_code}")
    } else {
        format!("{region}/{local_code}")
    }
}

/// `<region>/az/<storage type>`
pub(crate) fn storage_price_code(region: &str, type_code: &str) -> String {
    format!("{region}/az/{type_code}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_codes() {
        assert_eq!(
            price_code("europe-north", false, "three-year/linux-ds4v2-standard"),
            "europe-north/three-year/linux-ds4v2-standard"
        );
        assert_eq!(
            price_code("europe-north", true, "payg/windows-ds4v2-standard"),
            "europe-north/byol/payg/windows-ds4v2-standard"
        );
        assert_eq!(storage_price_code("us-east", "p10"), "us-east/az/p10");
    }

    #[test]
    fn test_importer_order() {
        let names: Vec<&str> = default_importers().iter().map(|i| i.name()).collect();
        assert_eq!(
            names,
            vec![
                CATEGORY_REGION,
                CATEGORY_COMPUTE,
                CATEGORY_DATABASE,
                CATEGORY_STORAGE,
                CATEGORY_SUPPORT
            ]
        );
    }
}
