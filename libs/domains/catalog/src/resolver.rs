//! Region and price term resolution.

use std::collections::BTreeMap;

use tracing::debug;

use crate::context::RunContext;
use crate::error::CatalogResult;
use crate::models::PriceTerm;
use crate::reference::ReferenceData;
use crate::repository::CatalogRepository;
use crate::upsert::upsert_entity;

/// Term code without commitment.
pub const DEFAULT_TERM: &str = "payg";
pub const TERM_LOW_PRIORITY: &str = "lowpriority";
pub const TERM_SPOT: &str = "spot";
/// Prefix of bring-your-own-license term names.
pub const BYOL_PREFIX: &str = "ahb";

/// Normalized term code of a raw term name within a SKU.
///
/// Low priority and spot SKUs force their own term whatever the raw name.
pub fn term_code(raw_term: &str, sku: &str) -> String {
    if sku.ends_with("-lowpriority") {
        return TERM_LOW_PRIORITY.to_string();
    }
    if sku.ends_with("-spot") {
        return TERM_SPOT.to_string();
    }
    let code = raw_term.strip_prefix(BYOL_PREFIX).unwrap_or(raw_term);
    let code = code.strip_prefix('-').unwrap_or(code);
    if code.is_empty() {
        DEFAULT_TERM.to_string()
    } else {
        code.to_string()
    }
}

/// Bring-your-own-license when the raw term name says so.
pub fn is_byol_term(raw_term: &str) -> bool {
    raw_term.contains(BYOL_PREFIX)
}

/// Reservation length in months encoded in a term code.
pub fn term_period(code: &str) -> u32 {
    if code.contains("three") {
        36
    } else if code.contains("five") {
        60
    } else if code.contains("one") {
        12
    } else {
        0
    }
}

/// Set every derived term attribute from its code.
pub fn merge_term(term: &mut PriceTerm, name: String) {
    let period = term_period(&term.code);
    let reservation = period > 0;
    term.name = name;
    term.period = period;
    term.reservation = reservation;
    term.convertible_family = reservation;
    term.convertible_type = reservation;
    term.convertible_location = reservation;
    term.convertible_os = reservation;
    term.ephemeral = term.code == TERM_LOW_PRIORITY || term.code == TERM_SPOT;
}

/// Find or create a region, merging static enrichment on first touch this run.
pub async fn resolve_region(
    context: &mut RunContext,
    store: &dyn CatalogRepository,
    reference: &ReferenceData,
    code: &str,
) -> CatalogResult<()> {
    if context.regions.is_merged(code) {
        return Ok(());
    }
    let name = context.region_names.get(code).cloned();
    let location = reference.regions.get(code).cloned();
    if location.is_none() {
        debug!(region = code, "No enrichment data for region");
    }
    upsert_entity(
        &mut context.regions,
        code,
        |region| {
            region.location = location.unwrap_or_default();
            if name.is_some() {
                region.description = name;
            }
        },
        store,
        &context.namespace,
        context.force,
    )
    .await?;
    Ok(())
}

/// Find or create the term of `raw_term` within `sku`.
///
/// Names come from the tier lookup, then the billing option lookup, then the
/// code itself.
pub async fn resolve_term(
    context: &mut RunContext,
    store: &dyn CatalogRepository,
    raw_term: &str,
    sku: &str,
    tiers: &BTreeMap<String, String>,
    billing: &BTreeMap<String, String>,
) -> CatalogResult<PriceTerm> {
    let code = term_code(raw_term, sku);
    if !context.terms.is_merged(&code) {
        let name = tiers
            .get(&code)
            .or_else(|| billing.get(&code))
            .cloned()
            .unwrap_or_else(|| code.clone());
        upsert_entity(
            &mut context.terms,
            &code,
            |term| merge_term(term, name),
            store,
            &context.namespace,
            context.force,
        )
        .await?;
    }
    Ok(context
        .terms
        .get(&code)
        .cloned()
        .unwrap_or_else(|| PriceTerm {
            code: code.clone(),
            ..PriceTerm::default()
        }))
}
