//! Virtual machine prices.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use super::{CATEGORY_COMPUTE, CatalogImporter, ImportEnv, fetch_document, prepare_document, price_code};
use crate::catalog::{ComputeCatalog, PricedOffer, component_list};
use crate::components::{OfferBinding, aggregate};
use crate::context::RunContext;
use crate::cost::Cost;
use crate::decoder::VmOfferKey;
use crate::error::CatalogResult;
use crate::models::{InstanceType, License, Rate, Tenancy, VmOs};
use crate::purge::purge_stale;
use crate::reference::RateTables;
use crate::resolver::{is_byol_term, resolve_region, resolve_term};
use crate::upsert::{upsert_entity, upsert_price};

pub const COMPUTE_PATH: &str = "/virtual-machines/calculator/";

/// Isolated sizes, running on hardware dedicated to one customer.
pub const DEDICATED_TYPES: [&str; 8] = [
    "e64", "m128ms", "g5", "gs5", "ds15v2", "d15v2", "f72v2", "l32",
];

pub struct VmImporter;

#[async_trait]
impl CatalogImporter for VmImporter {
    fn name(&self) -> &'static str {
        CATEGORY_COMPUTE
    }

    #[instrument(skip_all, fields(namespace = %context.namespace))]
    async fn install(&self, env: &ImportEnv<'_>, context: &mut RunContext) -> CatalogResult<()> {
        let store = env.store;
        let namespace = context.namespace.clone();
        context.instance_types.ensure_loaded(store, &namespace).await?;
        context.instance_prices.ensure_loaded(store, &namespace).await?;

        let catalog: ComputeCatalog = fetch_document(env, COMPUTE_PATH).await?;
        let names = prepare_document(env, context, &catalog.document).await?;
        let sizes = catalog.sizes_by_id();
        let software = catalog.software_by_prefix();
        let offers: BTreeMap<String, PricedOffer> = catalog.document.decode_offers();

        // Offers with a series resolve an instance type
        let mut bindings = BTreeMap::new();
        for (offer_id, offer) in &offers {
            if offer.series.as_deref().is_none_or(str::is_empty) {
                continue;
            }
            let Some(key) = VmOfferKey::parse(offer_id) else {
                warn!(offer = %offer_id, "Unrecognized compute offer");
                continue;
            };
            let code = key.type_code();
            let size_name = sizes.get(&key.size).cloned().unwrap_or_else(|| key.size.clone());
            let rates = &env.reference.rates;
            upsert_entity(
                &mut context.instance_types,
                &code,
                |t| merge_instance_type(t, &size_name, key.basic, offer, rates),
                store,
                &namespace,
                context.force,
            )
            .await?;
            let cpu = context.instance_types.get(&code).map_or(offer.cores, |t| t.cpu);
            bindings.insert(
                offer_id.clone(),
                OfferBinding {
                    type_code: code,
                    cpu,
                    ..OfferBinding::default()
                },
            );
        }
        debug!(offers = offers.len(), types = bindings.len(), "Decoded compute offers");

        for (sku, terms) in catalog.document.decode_skus() {
            let software = software
                .iter()
                .find(|(prefix, _)| sku.starts_with(prefix.as_str()))
                .map(|(_, name)| name.to_uppercase());
            let os = VmOs::from_parts(sku.split('-')).unwrap_or_default();
            for (raw_term, components) in &terms {
                let sku_term = SkuTerm {
                    sku: &sku,
                    raw_term,
                    components,
                    os,
                    software: software.as_deref(),
                };
                install_term_prices(env, context, &names, &offers, &bindings, sku_term).await?;
            }
        }

        let purged = purge_stale(&mut context.instance_prices, store, &namespace).await?;
        context.stats_mut(CATEGORY_COMPUTE).purged += purged;
        info!(
            prices = context.instance_prices.len(),
            types = context.instance_types.len(),
            "Compute import finished"
        );
        Ok(())
    }
}

struct SkuTerm<'a> {
    sku: &'a str,
    raw_term: &'a str,
    components: &'a Value,
    os: VmOs,
    software: Option<&'a str>,
}

async fn install_term_prices(
    env: &ImportEnv<'_>,
    context: &mut RunContext,
    names: &super::TermNames,
    offers: &BTreeMap<String, PricedOffer>,
    bindings: &BTreeMap<String, OfferBinding>,
    entry: SkuTerm<'_>,
) -> CatalogResult<()> {
    let store = env.store;
    let SkuTerm {
        sku,
        raw_term,
        components,
        os,
        software,
    } = entry;
    let term = resolve_term(context, store, raw_term, sku, &names.tiers, &names.billing).await?;

    let aggregated = match component_list(components)
        .and_then(|list| aggregate(&list, offers, bindings, &context.patterns))
    {
        Ok(aggregated) => aggregated,
        Err(error) => {
            warn!(%sku, term = %raw_term, %error, "Invalid component list");
            context.stats_mut(CATEGORY_COMPUTE).skip();
            return Ok(());
        }
    };
    let type_code = aggregated.binding.type_code.clone();
    if !context.patterns.is_enabled_os(&os.to_string())
        || !context.patterns.is_enabled_instance_type(&type_code)
    {
        debug!(%sku, %type_code, %os, "Filtered compute price");
        context.stats_mut(CATEGORY_COMPUTE).skip();
        return Ok(());
    }

    let byol = is_byol_term(raw_term);
    let local_code = format!("{}/{}", term.code, sku);
    let tenancy = if DEDICATED_TYPES.contains(&type_code.as_str()) {
        Tenancy::Dedicated
    } else {
        Tenancy::Shared
    };
    for (region, monthly) in aggregated.monthly_costs(context.hours_per_month) {
        resolve_region(context, store, env.reference, &region).await?;
        let code = price_code(&region, byol, &local_code);
        let outcome = upsert_price(
            &mut context.instance_prices,
            &code,
            |p| {
                p.region = region.clone();
                p.term = term.code.clone();
                p.type_code = type_code.clone();
                p.os = os;
                p.software = software.map(str::to_string);
                p.license = License::from_byol(byol);
                p.tenancy = tenancy;
                p.period = term.period;
            },
            &Cost::monthly(monthly, term.period),
            store,
            &context.namespace,
            context.force,
        )
        .await?;
        context.stats_mut(CATEGORY_COMPUTE).record(outcome);
    }
    Ok(())
}

/// Descriptive attributes of an instance type.
fn merge_instance_type(
    instance_type: &mut InstanceType,
    size_name: &str,
    basic: bool,
    offer: &PricedOffer,
    rates: &RateTables,
) {
    let series = offer.series.clone().unwrap_or_default();
    instance_type.name = if basic {
        format!("{size_name} Basic")
    } else {
        size_name.to_string()
    };
    instance_type.cpu = offer.cores;
    instance_type.ram = (offer.ram * 1024.0).round() as u32;
    instance_type.description = json!({ "series": series, "disk": offer.disk_size }).to_string();
    instance_type.constant = series != "B";
    instance_type.auto_scale = !basic;

    let rate = if basic { Rate::Low } else { Rate::Good };
    instance_type.cpu_rate = Some(if basic {
        Rate::Low
    } else {
        rates.cpu(&instance_type.code)
    });
    instance_type.ram_rate = Some(rate);
    instance_type.network_rate = Some(rates.network(&instance_type.code));
    instance_type.storage_rate = Some(rate);
}
