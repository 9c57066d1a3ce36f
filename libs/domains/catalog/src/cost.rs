//! Multi-dimension cost aggregation.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Dimension priced per core and per hour.
pub const PER_CORE_PER_HOUR: &str = "percoreperhour";
/// Prefix of every hourly dimension (`perhour`, `perhourspot`, ...).
pub const PER_HOUR_PREFIX: &str = "perhour";
/// Prefix of every monthly dimension.
pub const PER_MONTH_PREFIX: &str = "permonth";

/// Round to 3 decimals, the precision of every persisted cost.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Cost of a whole reservation period: `cost * max(1, period)`.
pub fn period_cost(monthly: f64, period: u32) -> f64 {
    round3(monthly * f64::from(period.max(1)))
}

/// Cost buckets of one aggregation unit (the global add-on or a region).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostAccumulator {
    pub per_core: f64,
    pub per_hour: f64,
    pub per_month: f64,
}

impl CostAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `value` to a bucket by dimension name.
    ///
    /// Returns `false` when the dimension is not recognized; the value is
    /// dropped in that case.
    pub fn accumulate(&mut self, dimension: &str, value: f64) -> bool {
        if dimension == PER_CORE_PER_HOUR {
            self.per_core += value;
        } else if dimension.starts_with(PER_HOUR_PREFIX) {
            self.per_hour += value;
        } else if dimension.starts_with(PER_MONTH_PREFIX) {
            self.per_month += value;
        } else {
            warn!(dimension, value, "Unrecognized cost dimension, value dropped");
            return false;
        }
        true
    }

    /// `per_month + (per_hour + per_core * cpu) * hours_per_month`
    pub fn to_monthly_cost(&self, cpu: f64, hours_per_month: f64) -> f64 {
        self.per_month + (self.per_hour + self.per_core * cpu) * hours_per_month
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Cost fields written on every occurrence of a price.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cost {
    /// Monthly cost, already rounded
    pub monthly: f64,
    /// Cost of the whole term period
    pub period: f64,
    /// Optional per-GiB component
    pub per_gb: Option<f64>,
    /// Optional per-transaction component
    pub transaction: Option<f64>,
}

impl Cost {
    /// Monthly cost rounded to 3 decimals with its period cost derived.
    pub fn monthly(raw: f64, period: u32) -> Self {
        let monthly = round3(raw);
        Self {
            monthly,
            period: period_cost(monthly, period),
            per_gb: None,
            transaction: None,
        }
    }

    /// Cost charged per GiB only.
    pub fn per_gb(value: f64) -> Self {
        Self {
            per_gb: Some(round3(value)),
            ..Self::default()
        }
    }

    pub fn with_transaction(mut self, transaction: f64) -> Self {
        self.transaction = Some(transaction);
        self
    }
}
