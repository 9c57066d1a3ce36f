//! Static reference tables bundled with the crate.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{Rate, RegionLocation, StorageType, SupportPrice, SupportType};

const REGIONS: &str = include_str!("../resources/regions.json");
const RATES: &str = include_str!("../resources/rates.json");
const DATABASE_RAM: &str = include_str!("../resources/database-ram.json");
const DB_STORAGE_TYPES: &str = include_str!("../resources/db-storage-type.csv");
const SUPPORT_TYPES: &str = include_str!("../resources/support-type.csv");
const SUPPORT_PRICES: &str = include_str!("../resources/support-price.csv");

/// Rating tables keyed by type code or code prefix.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct RateTables {
    pub cpu: BTreeMap<String, Rate>,
    pub ram: BTreeMap<String, Rate>,
    pub network: BTreeMap<String, Rate>,
}

impl RateTables {
    pub fn cpu(&self, code: &str) -> Rate {
        lookup_rate(&self.cpu, code)
    }

    pub fn ram(&self, code: &str) -> Rate {
        lookup_rate(&self.ram, code)
    }

    pub fn network(&self, code: &str) -> Rate {
        lookup_rate(&self.network, code)
    }
}

/// Exact code first, then the longest key prefixing the code, else medium.
fn lookup_rate(table: &BTreeMap<String, Rate>, code: &str) -> Rate {
    if let Some(rate) = table.get(code) {
        return *rate;
    }
    table
        .iter()
        .filter(|(key, _)| code.starts_with(key.as_str()))
        .max_by_key(|(key, _)| key.len())
        .map(|(_, rate)| *rate)
        .unwrap_or(Rate::Medium)
}

/// Every static table used by the importers, loaded once per process.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    /// Region code to geographic data
    pub regions: BTreeMap<String, RegionLocation>,
    pub rates: RateTables,
    /// RAM (GiB) per vCore, keyed by `<ENGINE>-gen<gen>` or by tier
    pub database_ram: BTreeMap<String, f64>,
    /// Database storage type baselines by code
    pub storage_types: BTreeMap<String, StorageType>,
    pub support_types: Vec<SupportType>,
    pub support_prices: Vec<SupportPrice>,
}

impl ReferenceData {
    /// Tables compiled into the binary.
    pub fn bundled() -> CatalogResult<Self> {
        let storage_types: Vec<StorageType> = from_csv("db-storage-type.csv", DB_STORAGE_TYPES)?;
        Ok(Self {
            regions: from_json("regions.json", REGIONS)?,
            rates: from_json("rates.json", RATES)?,
            database_ram: from_json("database-ram.json", DATABASE_RAM)?,
            storage_types: storage_types
                .into_iter()
                .map(|t| (t.code.clone(), t))
                .collect(),
            support_types: from_csv("support-type.csv", SUPPORT_TYPES)?,
            support_prices: from_csv("support-price.csv", SUPPORT_PRICES)?,
        })
    }

    /// RAM per vCore of an engine generation, falling back to the tier.
    pub fn database_ram_ratio(&self, engine: &str, generation: u32, tier: &str) -> Option<f64> {
        self.database_ram
            .get(&format!("{engine}-gen{generation}"))
            .or_else(|| self.database_ram.get(tier))
            .copied()
    }
}

fn from_json<T: DeserializeOwned>(name: &str, raw: &str) -> CatalogResult<T> {
    serde_json::from_str(raw).map_err(|e| CatalogError::Reference {
        name: name.to_string(),
        details: e.to_string(),
    })
}

fn from_csv<T: DeserializeOwned>(name: &str, raw: &str) -> CatalogResult<Vec<T>> {
    csv::Reader::from_reader(raw.as_bytes())
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(|e| CatalogError::Reference {
            name: name.to_string(),
            details: e.to_string(),
        })
}
