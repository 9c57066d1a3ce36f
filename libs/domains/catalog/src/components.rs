//! Aggregation of the components priced by one SKU term.

use std::collections::BTreeMap;

use tracing::debug;

use crate::catalog::{GLOBAL, PricedOffer};
use crate::cost::CostAccumulator;
use crate::decoder::ComponentRef;
use crate::enablement::EnablementPatterns;
use crate::error::ComponentError;

/// Type an offer resolved to while decoding, with what it binds to a price.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfferBinding {
    pub type_code: String,
    /// CPU count of the type, multiplying per-core costs
    pub cpu: f64,
    pub edition: Option<String>,
    pub storage_engine: Option<String>,
}

/// Costs of one SKU term, split between the global part and each region.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregated {
    pub binding: OfferBinding,
    pub global: CostAccumulator,
    pub regional: BTreeMap<String, CostAccumulator>,
}

impl Aggregated {
    /// Monthly cost per enabled region, global part included.
    pub fn monthly_costs(&self, hours_per_month: f64) -> BTreeMap<String, f64> {
        let cpu = self.binding.cpu;
        let global = self.global.to_monthly_cost(cpu, hours_per_month);
        self.regional
            .iter()
            .map(|(region, costs)| {
                (
                    region.clone(),
                    costs.to_monthly_cost(cpu, hours_per_month) + global,
                )
            })
            .collect()
    }
}

/// Aggregate a component list.
///
/// Every reference must name a known offer and one of its dimensions, or the
/// whole list is rejected. A dimension holding a `global` entry feeds the
/// global accumulator; any other feeds the accumulator of each enabled
/// region and binds the offer's resolved type to the price.
pub fn aggregate(
    components: &[&str],
    offers: &BTreeMap<String, PricedOffer>,
    bindings: &BTreeMap<String, OfferBinding>,
    patterns: &EnablementPatterns,
) -> Result<Aggregated, ComponentError> {
    let mut global = CostAccumulator::new();
    let mut regional: BTreeMap<String, CostAccumulator> = BTreeMap::new();
    let mut binding: Option<&OfferBinding> = None;
    let mut edition = None;
    let mut storage_engine = None;

    for component in components {
        let reference = ComponentRef::parse(component)?;
        let offer = offers
            .get(reference.offer)
            .ok_or_else(|| ComponentError::UnknownOffer(reference.offer.to_string()))?;
        let prices = offer.prices.get(reference.dimension).ok_or_else(|| {
            ComponentError::UnknownDimension {
                offer: reference.offer.to_string(),
                dimension: reference.dimension.to_string(),
            }
        })?;

        if let Some(value) = prices.get(GLOBAL) {
            global.accumulate(reference.dimension, value.value);
            continue;
        }
        for (region, value) in prices {
            if patterns.is_enabled_region(region) {
                regional
                    .entry(region.clone())
                    .or_default()
                    .accumulate(reference.dimension, value.value);
            }
        }
        if let Some(resolved) = bindings.get(reference.offer) {
            edition = resolved.edition.clone().or(edition);
            storage_engine = resolved.storage_engine.clone().or(storage_engine);
            binding = Some(resolved);
        }
    }

    let binding = binding.ok_or(ComponentError::UnresolvedType)?;
    debug!(
        type_code = %binding.type_code,
        regions = regional.len(),
        "Aggregated components"
    );
    Ok(Aggregated {
        binding: OfferBinding {
            edition,
            storage_engine,
            ..binding.clone()
        },
        global,
        regional,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ValueWrapper;
    use crate::config::EnablementConfig;

    fn offer(dimension: &str, values: &[(&str, f64)]) -> PricedOffer {
        PricedOffer {
            cores: 8.0,
            prices: BTreeMap::from([(
                dimension.to_string(),
                values
                    .iter()
                    .map(|(region, value)| (region.to_string(), ValueWrapper { value: *value }))
                    .collect(),
            )]),
            ..PricedOffer::default()
        }
    }

    fn fixture() -> (BTreeMap<String, PricedOffer>, BTreeMap<String, OfferBinding>) {
        let offers = BTreeMap::from([
            ("windows-license".to_string(), offer("permonth", &[("global", 0.15)])),
            (
                "linux-ds4v2-standard".to_string(),
                offer("perhour", &[("europe-north", 0.233), ("us-east", 0.2)]),
            ),
        ]);
        let bindings = BTreeMap::from([(
            "linux-ds4v2-standard".to_string(),
            OfferBinding {
                type_code: "ds4v2".to_string(),
                cpu: 8.0,
                ..OfferBinding::default()
            },
        )]);
        (offers, bindings)
    }

    #[test]
    fn test_global_and_regional_costs_are_summed() {
        let (offers, bindings) = fixture();
        let aggregated = aggregate(
            &["windows-license--permonth", "linux-ds4v2-standard--perhour"],
            &offers,
            &bindings,
            &EnablementPatterns::default(),
        )
        .unwrap();

        let costs = aggregated.monthly_costs(730.0);
        assert!((costs["europe-north"] - 170.24).abs() < 1e-9);
        assert!((costs["us-east"] - 146.15).abs() < 1e-9);
        assert_eq!(aggregated.binding.type_code, "ds4v2");
    }

    #[test]
    fn test_disabled_regions_are_not_aggregated() {
        let (offers, bindings) = fixture();
        let patterns = EnablementPatterns::compile(&EnablementConfig {
            regions: "europe-.*".to_string(),
            ..EnablementConfig::default()
        })
        .unwrap();
        let aggregated = aggregate(
            &["linux-ds4v2-standard--perhour"],
            &offers,
            &bindings,
            &patterns,
        )
        .unwrap();
        assert_eq!(aggregated.regional.keys().collect::<Vec<_>>(), vec!["europe-north"]);
    }

    #[test]
    fn test_any_bad_reference_invalidates_the_list() {
        let (offers, bindings) = fixture();
        let patterns = EnablementPatterns::default();

        assert_eq!(
            aggregate(&["linux-ds4v2-standard"], &offers, &bindings, &patterns),
            Err(ComponentError::InvalidShape("linux-ds4v2-standard".to_string()))
        );
        assert_eq!(
            aggregate(
                &["linux-ds4v2-standard--perhour", "missing--perhour"],
                &offers,
                &bindings,
                &patterns
            ),
            Err(ComponentError::UnknownOffer("missing".to_string()))
        );
        assert!(matches!(
            aggregate(&["windows-license--perhour"], &offers, &bindings, &patterns),
            Err(ComponentError::UnknownDimension { .. })
        ));
    }

    #[test]
    fn test_global_only_list_has_no_type() {
        let (offers, bindings) = fixture();
        assert_eq!(
            aggregate(
                &["windows-license--permonth"],
                &offers,
                &bindings,
                &EnablementPatterns::default()
            ),
            Err(ComponentError::UnresolvedType)
        );
    }
}
