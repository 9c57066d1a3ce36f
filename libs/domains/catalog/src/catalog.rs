//! Raw catalog documents as published by the pricing API.
//!
//! Documents are decoded leniently: offers and SKU term maps are kept as raw
//! JSON and decoded one by one, so a malformed entry only loses itself.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::{CatalogError, CatalogResult, ComponentError};

/// Region key of a region-agnostic price.
pub const GLOBAL: &str = "global";

/// Identifier and human name of a region, tier, billing option or size.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamedResource {
    #[serde(alias = "slug")]
    pub id: String,
    #[serde(alias = "displayName", default)]
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct ValueWrapper {
    #[serde(default)]
    pub value: f64,
}

/// Part shared by every category document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogDocument {
    pub regions: Vec<NamedResource>,
    pub tiers: Vec<NamedResource>,
    pub billing_options: Vec<NamedResource>,
    /// Offer id to raw offer
    pub offers: BTreeMap<String, Value>,
    /// SKU to raw `{ term: [component, ...] }`
    pub skus: BTreeMap<String, Value>,
}

impl CatalogDocument {
    pub fn tiers_by_id(&self) -> BTreeMap<String, String> {
        to_names(&self.tiers)
    }

    pub fn billing_by_id(&self) -> BTreeMap<String, String> {
        to_names(&self.billing_options)
    }

    /// Decode every offer, skipping the malformed ones.
    pub fn decode_offers<T: DeserializeOwned>(&self) -> BTreeMap<String, T> {
        self.offers
            .iter()
            .filter_map(|(id, raw)| match T::deserialize(raw) {
                Ok(offer) => Some((id.clone(), offer)),
                Err(error) => {
                    warn!(offer = %id, %error, "Malformed offer skipped");
                    None
                }
            })
            .collect()
    }

    /// Decode every SKU term map, skipping the malformed ones.
    ///
    /// Component lists stay raw; see [`component_list`].
    pub fn decode_skus(&self) -> BTreeMap<String, BTreeMap<String, Value>> {
        self.skus
            .iter()
            .filter_map(|(sku, raw)| match raw {
                Value::Object(terms) => Some((
                    sku.clone(),
                    terms.iter().map(|(t, c)| (t.clone(), c.clone())).collect(),
                )),
                _ => {
                    warn!(%sku, "Malformed SKU term mapping skipped");
                    None
                }
            })
            .collect()
    }
}

/// Compute (virtual machine) document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComputeCatalog {
    #[serde(flatten)]
    pub document: CatalogDocument,
    pub software_licenses: Vec<NamedResource>,
    pub sizes_one_year: Vec<NamedResource>,
    pub sizes_three_year: Vec<NamedResource>,
    pub sizes_five_year: Vec<NamedResource>,
    pub sizes_pay_go: Vec<NamedResource>,
}

impl ComputeCatalog {
    /// Size names from every term-specific list, later lists overriding.
    pub fn sizes_by_id(&self) -> BTreeMap<String, String> {
        let mut sizes = to_names(&self.sizes_one_year);
        sizes.extend(to_names(&self.sizes_three_year));
        sizes.extend(to_names(&self.sizes_five_year));
        sizes.extend(to_names(&self.sizes_pay_go));
        sizes
    }

    /// Software license prefixes, the longest first.
    pub fn software_by_prefix(&self) -> Vec<(String, String)> {
        let mut software: Vec<(String, String)> = to_names(&self.software_licenses)
            .into_iter()
            .collect();
        software.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        software
    }
}

/// Managed database document (one per engine).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseCatalog {
    #[serde(flatten)]
    pub document: CatalogDocument,
    pub compute_types: Vec<NamedResource>,
}

/// Managed disk document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagedDiskCatalog {
    #[serde(flatten)]
    pub document: CatalogDocument,
    pub sizes: Vec<NamedResource>,
}

/// Compute or database offer: `prices` is `dimension -> region|global -> value`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PricedOffer {
    pub cores: f64,
    pub series: Option<String>,
    /// GiB
    pub ram: f64,
    /// GiB
    pub disk_size: f64,
    pub prices: BTreeMap<String, BTreeMap<String, ValueWrapper>>,
}

/// Managed disk offer: `prices` is `region -> value`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DiskOffer {
    /// GiB
    pub size: f64,
    /// MB/s
    #[serde(rename = "speed")]
    pub throughput: u32,
    pub iops: u32,
    pub prices: BTreeMap<String, ValueWrapper>,
}

/// Parse a fetched body, an empty one being an empty document.
pub fn parse_document<T: DeserializeOwned + Default>(path: &str, body: &str) -> CatalogResult<T> {
    if body.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(body).map_err(|source| CatalogError::Document {
        path: path.to_string(),
        source,
    })
}

/// A raw component list must be an array of strings.
pub fn component_list(raw: &Value) -> Result<Vec<&str>, ComponentError> {
    raw.as_array()
        .ok_or(ComponentError::InvalidList)?
        .iter()
        .map(|c| c.as_str().ok_or(ComponentError::InvalidList))
        .collect()
}

fn to_names(resources: &[NamedResource]) -> BTreeMap<String, String> {
    resources
        .iter()
        .map(|r| (r.id.clone(), r.name.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_named_resource_accepts_both_spellings() {
        let slug: NamedResource =
            serde_json::from_value(json!({"slug": "europe-north", "displayName": "North Europe"}))
                .unwrap();
        let id: NamedResource =
            serde_json::from_value(json!({"id": "europe-north", "name": "North Europe"})).unwrap();
        assert_eq!(slug, id);
    }

    #[test]
    fn test_empty_body_is_empty_document() {
        let doc: ComputeCatalog = parse_document("/virtual-machines/calculator/", "  ").unwrap();
        assert!(doc.document.offers.is_empty());
        assert!(doc.document.regions.is_empty());
    }

    #[test]
    fn test_malformed_body_is_a_document_error() {
        let err = parse_document::<DatabaseCatalog>("/mysql/calculator/", "<html>").unwrap_err();
        assert!(matches!(err, CatalogError::Document { .. }));
    }

    #[test]
    fn test_malformed_offer_is_skipped_alone() {
        let doc: CatalogDocument = serde_json::from_value(json!({
            "offers": {
                "linux-ds4v2-standard": {"cores": 8, "prices": {"perhour": {"europe-north": {"value": 0.233}}}},
                "linux-broken-standard": {"cores": "eight"}
            }
        }))
        .unwrap();
        let offers: BTreeMap<String, PricedOffer> = doc.decode_offers();
        assert_eq!(offers.len(), 1);
        assert_eq!(offers["linux-ds4v2-standard"].cores, 8.0);
        assert_eq!(
            offers["linux-ds4v2-standard"].prices["perhour"]["europe-north"].value,
            0.233
        );
    }

    #[test]
    fn test_malformed_sku_mapping_is_skipped_alone() {
        let doc: CatalogDocument = serde_json::from_value(json!({
            "skus": {
                "linux-ds4v2-standard": {"payg": ["linux-ds4v2-standard--perhour"]},
                "broken": ["not", "a", "map"]
            }
        }))
        .unwrap();
        let skus = doc.decode_skus();
        assert_eq!(skus.len(), 1);
        assert!(skus.contains_key("linux-ds4v2-standard"));
    }

    #[test]
    fn test_component_list_shape() {
        assert_eq!(component_list(&json!(["a--perhour"])).unwrap(), vec!["a--perhour"]);
        assert_eq!(component_list(&json!("a--perhour")), Err(ComponentError::InvalidList));
        assert_eq!(component_list(&json!(["a", 1])), Err(ComponentError::InvalidList));
    }

    #[test]
    fn test_sizes_and_software_lookups() {
        let doc: ComputeCatalog = serde_json::from_value(json!({
            "sizesPayGo": [{"slug": "ds4v2", "displayName": "DS4 v2"}],
            "sizesOneYear": [{"slug": "a1", "displayName": "A1"}],
            "softwareLicenses": [
                {"slug": "sql", "displayName": "sql"},
                {"slug": "sql-enterprise", "displayName": "sql enterprise"}
            ]
        }))
        .unwrap();
        assert_eq!(doc.sizes_by_id()["ds4v2"], "DS4 v2");
        assert_eq!(doc.sizes_by_id().len(), 2);
        assert_eq!(doc.software_by_prefix()[0].0, "sql-enterprise");
    }

    #[test]
    fn test_disk_offer_reads_speed_as_throughput() {
        let disk: DiskOffer = serde_json::from_value(json!({
            "size": 128, "speed": 100, "iops": 500,
            "prices": {"europe-north": {"value": 5.28}}
        }))
        .unwrap();
        assert_eq!(disk.throughput, 100);
        assert_eq!(disk.prices["europe-north"].value, 5.28);
    }
}
