//! Normalized catalog entities.
//!
//! Every entity is addressed by a natural code, unique per kind and catalog
//! namespace, and persisted as a typed payload.

use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Kind of persisted catalog entity
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "catalog_entry_kind")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    #[sea_orm(string_value = "region")]
    Region,
    #[sea_orm(string_value = "price_term")]
    PriceTerm,
    #[sea_orm(string_value = "instance_type")]
    InstanceType,
    #[sea_orm(string_value = "database_type")]
    DatabaseType,
    #[sea_orm(string_value = "storage_type")]
    StorageType,
    #[sea_orm(string_value = "support_type")]
    SupportType,
    #[sea_orm(string_value = "instance_price")]
    InstancePrice,
    #[sea_orm(string_value = "database_price")]
    DatabasePrice,
    #[sea_orm(string_value = "storage_price")]
    StoragePrice,
    #[sea_orm(string_value = "support_price")]
    SupportPrice,
}

/// Qualitative rating
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Rate {
    Worst,
    Low,
    Medium,
    Good,
    Best,
}

/// Operating system of a compute price
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum VmOs {
    Linux,
    #[default]
    Windows,
    #[strum(to_string = "rhel", serialize = "redhat")]
    Rhel,
    #[strum(to_string = "suse", serialize = "sles")]
    Suse,
    Centos,
    Debian,
    Ubuntu,
    Oracle,
    Freebsd,
}

impl VmOs {
    /// First identifier part naming a known OS.
    pub fn from_parts<'a>(parts: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        parts.into_iter().find_map(|part| part.parse().ok())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tenancy {
    #[default]
    Shared,
    Dedicated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum License {
    /// License cost included in the price
    #[default]
    Included,
    /// Bring your own license
    Byol,
}

impl License {
    pub fn from_byol(byol: bool) -> Self {
        if byol { Self::Byol } else { Self::Included }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StorageOptimized {
    Iops,
    Throughput,
    Durability,
}

/// Access level of a support channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SupportAccess {
    All,
    Business,
    Technical,
}

/// Static geographic data attached to a region
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegionLocation {
    pub placement: Option<String>,
    pub continent_m49: Option<u32>,
    pub country_m49: Option<u32>,
    pub country_a2: Option<String>,
    pub region_m49: Option<u32>,
    pub sub_region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Provider region code, e.g. `europe-north`
    pub code: String,
    /// Human name published by the catalog
    pub description: Option<String>,
    #[serde(flatten)]
    pub location: RegionLocation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceTerm {
    pub code: String,
    pub name: String,
    /// Reservation length in months, 0 without commitment
    pub period: u32,
    pub reservation: bool,
    pub convertible_family: bool,
    pub convertible_type: bool,
    pub convertible_location: bool,
    pub convertible_os: bool,
    /// Capacity may be reclaimed by the provider (spot, low priority)
    pub ephemeral: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceType {
    pub code: String,
    pub name: String,
    pub cpu: f64,
    /// RAM in MiB
    pub ram: u32,
    pub description: String,
    /// Constant CPU performance (not burstable)
    pub constant: bool,
    pub auto_scale: bool,
    pub cpu_rate: Option<Rate>,
    pub ram_rate: Option<Rate>,
    pub network_rate: Option<Rate>,
    pub storage_rate: Option<Rate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseType {
    pub code: String,
    pub name: String,
    pub cpu: f64,
    /// RAM in MiB
    pub ram: u32,
    pub description: String,
    pub baseline: f64,
    pub cpu_rate: Option<Rate>,
    pub ram_rate: Option<Rate>,
    pub network_rate: Option<Rate>,
    pub storage_rate: Option<Rate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageType {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub latency: Option<Rate>,
    pub optimized: Option<StorageOptimized>,
    /// Minimal size in GiB
    pub minimal: f64,
    /// Maximal size in GiB
    pub maximal: Option<f64>,
    pub iops: u32,
    /// MB/s
    pub throughput: u32,
    /// Compatible instance type pattern (`%` for all)
    pub instance_type: Option<String>,
    /// Compatible database type pattern
    pub database_type: Option<String>,
    pub engine: Option<String>,
    pub availability: Option<f64>,
    pub durability9: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportType {
    pub code: String,
    pub description: Option<String>,
    pub access_api: Option<SupportAccess>,
    pub access_chat: Option<SupportAccess>,
    pub access_email: Option<SupportAccess>,
    pub access_phone: Option<SupportAccess>,
    /// Minutes from midnight (UTC)
    pub sla_start_time: Option<u32>,
    pub sla_end_time: Option<u32>,
    /// Response times in minutes
    pub sla_business_critical_system_down: Option<u32>,
    pub sla_general_guidance: Option<u32>,
    pub sla_production_system_down: Option<u32>,
    pub sla_production_system_impaired: Option<u32>,
    pub sla_system_impaired: Option<u32>,
    pub sla_week_end: bool,
    pub commitment: Option<u32>,
    pub seats: Option<u32>,
    pub level: Option<Rate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstancePrice {
    /// `<region>[/byol]/<term>/<sku>`
    pub code: String,
    pub region: String,
    pub term: String,
    pub type_code: String,
    pub os: VmOs,
    pub software: Option<String>,
    pub license: License,
    pub tenancy: Tenancy,
    pub period: u32,
    pub cost: f64,
    pub cost_period: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabasePrice {
    /// `<region>[/byol]/<term>/<sku>/<engine>`
    pub code: String,
    pub region: String,
    pub term: String,
    pub type_code: String,
    pub engine: String,
    pub edition: Option<String>,
    pub storage_engine: Option<String>,
    pub license: License,
    pub period: u32,
    pub cost: f64,
    pub cost_period: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoragePrice {
    /// `<region>/az/<type>`
    pub code: String,
    pub region: String,
    pub type_code: String,
    /// Fixed monthly cost
    pub cost: f64,
    /// Monthly cost per GiB
    pub cost_gb: f64,
    /// Cost per million transactions
    pub cost_transaction: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportPrice {
    pub code: String,
    pub type_code: String,
    /// Minimal monthly cost
    pub cost: f64,
    pub min: f64,
    /// Spending thresholds, `;` separated
    pub limit: Option<String>,
    /// Percentages applied per threshold, `;` separated
    pub rate: Option<String>,
}
