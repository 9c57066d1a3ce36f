//! Managed database prices, one document per engine.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use super::{
    CATEGORY_DATABASE, CATEGORY_STORAGE, CatalogImporter, ImportEnv, fetch_document,
    prepare_document, price_code, storage_price_code,
};
use crate::catalog::{DatabaseCatalog, PricedOffer, component_list};
use crate::components::{OfferBinding, aggregate};
use crate::context::RunContext;
use crate::cost::Cost;
use crate::decoder::{DatabaseCompute, DatabaseDecoder, DatabaseOfferRole, is_ignored_database_sku};
use crate::error::CatalogResult;
use crate::models::{DatabaseType, License};
use crate::purge::purge_stale_where;
use crate::reference::ReferenceData;
use crate::resolver::{is_byol_term, resolve_region, resolve_term};
use crate::upsert::{upsert_entity, upsert_price};

/// Dimension of storage offers.
const PER_GB: &str = "pergb";

/// One database engine and the document publishing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseEngine {
    pub path: &'static str,
    pub engine: &'static str,
    pub edition: Option<&'static str>,
    pub storage_engine: Option<&'static str>,
    sql_server: bool,
}

impl DatabaseEngine {
    pub fn document_path(&self) -> String {
        format!("/{}/calculator/", self.path)
    }
}

/// Engines in import order.
pub const DATABASE_ENGINES: [DatabaseEngine; 4] = [
    DatabaseEngine {
        path: "mysql",
        engine: "MYSQL",
        edition: None,
        storage_engine: None,
        sql_server: false,
    },
    DatabaseEngine {
        path: "mariadb",
        engine: "MARIADB",
        edition: None,
        storage_engine: None,
        sql_server: false,
    },
    DatabaseEngine {
        path: "postgresql",
        engine: "POSTGRESQL",
        edition: None,
        storage_engine: None,
        sql_server: false,
    },
    DatabaseEngine {
        path: "sql-database",
        engine: "SQL SERVER",
        edition: Some("ENTERPRISE"),
        storage_engine: Some("SQL SERVER"),
        sql_server: true,
    },
];

pub struct DatabaseImporter;

#[async_trait]
impl CatalogImporter for DatabaseImporter {
    fn name(&self) -> &'static str {
        CATEGORY_DATABASE
    }

    #[instrument(skip_all, fields(namespace = %context.namespace))]
    async fn install(&self, env: &ImportEnv<'_>, context: &mut RunContext) -> CatalogResult<()> {
        let store = env.store;
        let namespace = context.namespace.clone();
        context.database_types.ensure_loaded(store, &namespace).await?;
        context.storage_types.ensure_loaded(store, &namespace).await?;
        context.database_prices.ensure_loaded(store, &namespace).await?;
        context.storage_prices.ensure_loaded(store, &namespace).await?;

        let open_source = DatabaseDecoder::open_source()?;
        let sql_server = DatabaseDecoder::sql_server()?;
        for engine in DATABASE_ENGINES {
            if !context.patterns.is_enabled_engine(engine.engine) {
                info!(engine = engine.engine, "Database engine disabled");
                continue;
            }
            let decoder = if engine.sql_server {
                &sql_server
            } else {
                &open_source
            };
            install_engine(env, context, engine, decoder).await?;

            let purged = purge_stale_where(&mut context.database_prices, store, &namespace, |p| {
                p.engine == engine.engine
            })
            .await?;
            context.stats_mut(CATEGORY_DATABASE).purged += purged;
        }

        info!(
            prices = context.database_prices.len(),
            types = context.database_types.len(),
            "Database import finished"
        );
        Ok(())
    }
}

#[instrument(skip_all, fields(engine = engine.engine))]
async fn install_engine(
    env: &ImportEnv<'_>,
    context: &mut RunContext,
    engine: DatabaseEngine,
    decoder: &DatabaseDecoder,
) -> CatalogResult<()> {
    let catalog: DatabaseCatalog = fetch_document(env, &engine.document_path()).await?;
    let names = prepare_document(env, context, &catalog.document).await?;
    let mut sizes: BTreeMap<String, String> = catalog
        .compute_types
        .iter()
        .map(|size| (size.id.clone(), size.name.clone()))
        .collect();
    sizes.extend(decoder.tier_names.iter().cloned());

    let offers: BTreeMap<String, PricedOffer> = catalog.document.decode_offers();
    let mut bindings = BTreeMap::new();
    for (offer_id, offer) in &offers {
        let per_gb = offer.prices.get(PER_GB);
        match decoder.classify(offer_id, per_gb.is_some()) {
            None => debug!(offer = %offer_id, "Ignored database offer"),
            Some(DatabaseOfferRole::Storage { type_codes }) => {
                let Some(per_gb) = per_gb else { continue };
                for type_code in type_codes {
                    if !install_storage_type(env, context, &type_code).await? {
                        continue;
                    }
                    for (region, value) in per_gb {
                        if !context.patterns.is_enabled_region(region) {
                            continue;
                        }
                        resolve_region(context, env.store, env.reference, region).await?;
                        let outcome = upsert_price(
                            &mut context.storage_prices,
                            &storage_price_code(region, &type_code),
                            |p| {
                                p.region = region.clone();
                                p.type_code = type_code.clone();
                            },
                            &Cost::per_gb(value.value),
                            env.store,
                            &context.namespace,
                            context.force,
                        )
                        .await?;
                        context.stats_mut(CATEGORY_STORAGE).record(outcome);
                    }
                }
            }
            Some(DatabaseOfferRole::Compute(compute)) => {
                if let Some(binding) =
                    install_database_type(env, context, engine, &compute, &sizes).await?
                {
                    bindings.insert(offer_id.clone(), binding);
                }
            }
        }
    }
    debug!(offers = offers.len(), types = bindings.len(), "Decoded database offers");

    for (sku, terms) in catalog.document.decode_skus() {
        if is_ignored_database_sku(&sku) {
            continue;
        }
        for (raw_term, components) in &terms {
            let term =
                resolve_term(context, env.store, raw_term, &sku, &names.tiers, &names.billing)
                    .await?;
            let aggregated = match component_list(components)
                .and_then(|list| aggregate(&list, &offers, &bindings, &context.patterns))
            {
                Ok(aggregated) => aggregated,
                Err(error) => {
                    warn!(%sku, term = %raw_term, %error, "Invalid component list");
                    context.stats_mut(CATEGORY_DATABASE).skip();
                    continue;
                }
            };
            let binding = &aggregated.binding;
            if !context.patterns.is_enabled_database_type(&binding.type_code) {
                context.stats_mut(CATEGORY_DATABASE).skip();
                continue;
            }

            let byol = is_byol_term(raw_term);
            let local_code = format!("{}/{}/{}", term.code, sku, engine.engine);
            for (region, monthly) in aggregated.monthly_costs(context.hours_per_month) {
                resolve_region(context, env.store, env.reference, &region).await?;
                let outcome = upsert_price(
                    &mut context.database_prices,
                    &price_code(&region, byol, &local_code),
                    |p| {
                        p.region = region.clone();
                        p.term = term.code.clone();
                        p.type_code = binding.type_code.clone();
                        p.engine = engine.engine.to_string();
                        p.edition = binding.edition.clone();
                        p.storage_engine = binding.storage_engine.clone();
                        p.license = License::from_byol(byol);
                        p.period = term.period;
                    },
                    &Cost::monthly(monthly, term.period),
                    env.store,
                    &context.namespace,
                    context.force,
                )
                .await?;
                context.stats_mut(CATEGORY_DATABASE).record(outcome);
            }
        }
    }
    Ok(())
}

/// Upsert a database storage type from its bundled baseline.
///
/// Returns `false` when no baseline describes `code`.
async fn install_storage_type(
    env: &ImportEnv<'_>,
    context: &mut RunContext,
    code: &str,
) -> CatalogResult<bool> {
    let Some(baseline) = env.reference.storage_types.get(code) else {
        error!(storage_type = code, "No baseline for database storage type");
        return Ok(false);
    };
    upsert_entity(
        &mut context.storage_types,
        code,
        |t| {
            *t = baseline.clone();
            t.code = code.to_string();
            t.name = code.to_string();
        },
        env.store,
        &context.namespace,
        context.force,
    )
    .await?;
    Ok(true)
}

/// Upsert the database type of a compute offer; `None` when disabled or
/// without a RAM mapping.
async fn install_database_type(
    env: &ImportEnv<'_>,
    context: &mut RunContext,
    engine: DatabaseEngine,
    compute: &DatabaseCompute,
    sizes: &BTreeMap<String, String>,
) -> CatalogResult<Option<OfferBinding>> {
    let code = compute.type_code();
    if !context.patterns.is_enabled_database_type(&code) {
        return Ok(None);
    }
    let Some(ratio) = env
        .reference
        .database_ram_ratio(engine.engine, compute.generation, &compute.tier)
    else {
        error!(
            engine = engine.engine,
            generation = compute.generation,
            tier = %compute.tier,
            "No vCore/RAM mapping for database type"
        );
        return Ok(None);
    };

    upsert_entity(
        &mut context.database_types,
        &code,
        |t| merge_database_type(t, engine.engine, compute, ratio, sizes, env.reference),
        env.store,
        &context.namespace,
        context.force,
    )
    .await?;
    Ok(Some(OfferBinding {
        type_code: code,
        cpu: f64::from(compute.vcore),
        edition: engine.edition.map(str::to_string),
        storage_engine: engine.storage_engine.map(str::to_string),
    }))
}

fn merge_database_type(
    database_type: &mut DatabaseType,
    engine: &str,
    compute: &DatabaseCompute,
    ram_per_vcore: f64,
    sizes: &BTreeMap<String, String>,
    reference: &ReferenceData,
) {
    let generation_id = format!("gen{}", compute.generation);
    let size_name = |id: &str| sizes.get(id).cloned().unwrap_or_else(|| id.to_string());
    let tier = compute.tier.as_str();
    let rates = &reference.rates;

    database_type.cpu = f64::from(compute.vcore);
    database_type.ram = (ram_per_vcore * f64::from(compute.vcore) * 1024.0).round() as u32;
    database_type.name = format!(
        "{}-{} {}",
        size_name(&generation_id),
        compute.vcore,
        size_name(tier)
    );
    database_type.description =
        json!({ "gen": compute.generation.to_string(), "engine": engine, "tier": tier }).to_string();
    database_type.baseline = 100.0;
    database_type.cpu_rate = Some(rates.cpu(tier));
    database_type.ram_rate = Some(rates.ram(tier));
    // Network and storage follow the CPU rating
    database_type.network_rate = Some(rates.cpu(tier));
    database_type.storage_rate = Some(rates.cpu(tier));
}
