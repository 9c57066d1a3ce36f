use async_trait::async_trait;
use tracing::{info, instrument};

use super::{CATEGORY_SUPPORT, CatalogImporter, ImportEnv};
use crate::context::RunContext;
use crate::cost::Cost;
use crate::error::CatalogResult;
use crate::purge::purge_stale;
use crate::upsert::{upsert_entity, upsert_price};

/// Support plans, from the bundled tables only.
pub struct SupportImporter;

#[async_trait]
impl CatalogImporter for SupportImporter {
    fn name(&self) -> &'static str {
        CATEGORY_SUPPORT
    }

    #[instrument(skip_all, fields(namespace = %context.namespace))]
    async fn install(&self, env: &ImportEnv<'_>, context: &mut RunContext) -> CatalogResult<()> {
        let store = env.store;
        let namespace = context.namespace.clone();
        context.support_types.ensure_loaded(store, &namespace).await?;
        context.support_prices.ensure_loaded(store, &namespace).await?;

        for baseline in &env.reference.support_types {
            upsert_entity(
                &mut context.support_types,
                &baseline.code,
                |t| *t = baseline.clone(),
                store,
                &namespace,
                context.force,
            )
            .await?;
        }

        for baseline in &env.reference.support_prices {
            let outcome = upsert_price(
                &mut context.support_prices,
                &baseline.code,
                |p| {
                    p.type_code = baseline.type_code.clone();
                    p.min = baseline.min;
                    p.limit = baseline.limit.clone();
                    p.rate = baseline.rate.clone();
                },
                &Cost::monthly(baseline.cost, 0),
                store,
                &namespace,
                context.force,
            )
            .await?;
            context.stats_mut(CATEGORY_SUPPORT).record(outcome);
        }

        let purged = purge_stale(&mut context.support_prices, store, &namespace).await?;
        context.stats_mut(CATEGORY_SUPPORT).purged += purged;
        info!(
            prices = context.support_prices.len(),
            types = context.support_types.len(),
            "Support import finished"
        );
        Ok(())
    }
}
