use async_trait::async_trait;
use tracing::{info, instrument};

use super::{CATEGORY_REGION, CatalogImporter, ImportEnv};
use crate::context::RunContext;
use crate::error::CatalogResult;

/// Loads the regions and terms persisted by previous runs.
pub struct BaseImporter;

#[async_trait]
impl CatalogImporter for BaseImporter {
    fn name(&self) -> &'static str {
        CATEGORY_REGION
    }

    #[instrument(skip_all, fields(namespace = %context.namespace))]
    async fn install(&self, env: &ImportEnv<'_>, context: &mut RunContext) -> CatalogResult<()> {
        let namespace = context.namespace.clone();
        context.regions.ensure_loaded(env.store, &namespace).await?;
        context.terms.ensure_loaded(env.store, &namespace).await?;
        info!(
            regions = context.regions.len(),
            terms = context.terms.len(),
            "Loaded base catalog"
        );
        Ok(())
    }
}
