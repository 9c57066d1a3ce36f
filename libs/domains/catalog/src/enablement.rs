//! Enablement filter.
//!
//! Each axis (region, instance type, OS, database type, database engine) owns a
//! compiled pattern. A candidate is enabled when the pattern matches the whole
//! identifier, never a substring of it.

use regex::{Regex, RegexBuilder};

use crate::config::EnablementConfig;
use crate::error::{CatalogError, CatalogResult};

/// A compiled, anchored inclusion pattern. `None` accepts everything.
#[derive(Debug, Clone, Default)]
pub struct Enablement {
    regex: Option<Regex>,
}

impl Enablement {
    /// Compile `pattern` so that it must match the complete candidate.
    pub fn compile(key: &str, pattern: &str, case_insensitive: bool) -> CatalogResult<Self> {
        let regex = RegexBuilder::new(&format!("^(?:{pattern})$"))
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|source| CatalogError::Pattern {
                key: key.to_string(),
                source,
            })?;
        Ok(Self { regex: Some(regex) })
    }

    /// Pattern accepting every candidate.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self, candidate: &str) -> bool {
        self.regex
            .as_ref()
            .is_none_or(|regex| regex.is_match(candidate))
    }
}

/// All enablement axes of a run.
#[derive(Debug, Clone, Default)]
pub struct EnablementPatterns {
    pub regions: Enablement,
    pub instance_types: Enablement,
    pub os: Enablement,
    pub database_types: Enablement,
    pub database_engines: Enablement,
}

impl EnablementPatterns {
    /// Compile every configured pattern, failing on the first invalid one.
    ///
    /// OS and instance type patterns ignore case; the others are exact.
    pub fn compile(config: &EnablementConfig) -> CatalogResult<Self> {
        Ok(Self {
            regions: Enablement::compile("regions", &config.regions, false)?,
            instance_types: Enablement::compile("instance-types", &config.instance_types, true)?,
            os: Enablement::compile("os", &config.os, true)?,
            database_types: Enablement::compile("database-types", &config.database_types, false)?,
            database_engines: Enablement::compile(
                "database-engines",
                &config.database_engines,
                false,
            )?,
        })
    }

    pub fn is_enabled_region(&self, region: &str) -> bool {
        self.regions.is_enabled(region)
    }

    pub fn is_enabled_instance_type(&self, code: &str) -> bool {
        self.instance_types.is_enabled(code)
    }

    pub fn is_enabled_os(&self, os: &str) -> bool {
        self.os.is_enabled(os)
    }

    pub fn is_enabled_database_type(&self, code: &str) -> bool {
        self.database_types.is_enabled(code)
    }

    pub fn is_enabled_engine(&self, engine: &str) -> bool {
        self.database_engines.is_enabled(engine)
    }
}
