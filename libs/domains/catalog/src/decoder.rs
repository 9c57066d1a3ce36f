//! SKU and offer decoding.
//!
//! Each product category owns ordered [`RuleTable`]s. An identifier is tested
//! against every rule in declaration order and the first full match decides;
//! later rules are never consulted, so specific patterns must be declared
//! before generic ones.

use regex::{Captures, Regex};

use crate::error::{CatalogError, CatalogResult, ComponentError};
use crate::models::VmOs;

type Extractor<T> = Box<dyn Fn(&Captures<'_>) -> Option<T> + Send + Sync>;

/// One `(pattern, extractor)` pair.
pub struct Rule<T> {
    pattern: Regex,
    extract: Extractor<T>,
}

impl<T> Rule<T> {
    /// Pattern as declared, without the anchors.
    pub fn pattern(&self) -> &str {
        let anchored = self.pattern.as_str();
        anchored
            .strip_prefix("^(?:")
            .and_then(|p| p.strip_suffix(")$"))
            .unwrap_or(anchored)
    }
}

/// Ordered, first-match-wins rule list.
pub struct RuleTable<T> {
    rules: Vec<Rule<T>>,
}

impl<T> Default for RuleTable<T> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<T> RuleTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule matching the whole identifier.
    pub fn rule<F>(mut self, pattern: &str, extract: F) -> CatalogResult<Self>
    where
        F: Fn(&Captures<'_>) -> Option<T> + Send + Sync + 'static,
    {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
            CatalogError::Pattern {
                key: pattern.to_string(),
                source,
            }
        })?;
        self.rules.push(Rule {
            pattern: regex,
            extract: Box::new(extract),
        });
        Ok(self)
    }

    /// Result of the first matching rule, `None` when no rule matches.
    ///
    /// A matching rule whose extractor declines stops the evaluation too.
    pub fn decode(&self, id: &str) -> Option<T> {
        self.rules
            .iter()
            .find_map(|rule| rule.pattern.captures(id).map(|caps| (rule.extract)(&caps)))
            .flatten()
    }

    /// Index of the rule deciding `id`.
    pub fn matching_rule(&self, id: &str) -> Option<usize> {
        self.rules.iter().position(|rule| rule.pattern.is_match(id))
    }

    pub fn rules(&self) -> &[Rule<T>] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Compute attributes decoded from a database offer id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseCompute {
    /// Short tier: `gp`, `mo`, `basic`, `sql-gp`, `sql-bc`
    pub tier: String,
    pub generation: u32,
    pub vcore: u32,
}

impl DatabaseCompute {
    /// `<tier>-gen<gen>-<vcore>`
    pub fn type_code(&self) -> String {
        format!("{}-gen{}-{}", self.tier, self.generation, self.vcore).to_lowercase()
    }
}

/// Role of a database offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseOfferRole {
    /// Priced per GiB, feeding the listed storage types
    Storage { type_codes: Vec<String> },
    Compute(DatabaseCompute),
}

/// Storage and compute rule tables of one engine family.
pub struct DatabaseDecoder {
    storage: RuleTable<Vec<String>>,
    compute: RuleTable<DatabaseCompute>,
    /// Tier names the catalog does not publish
    pub tier_names: Vec<(String, String)>,
}

const OPEN_SOURCE_PREFIX: &str = "(generalpurpose|basic|memoryoptimized)-";
const SQL_PREFIX: &str = "elastic-vcore-";

fn short_tier(name: &str) -> &str {
    match name {
        "generalpurpose" | "general-purpose" => "gp",
        "business-critical" => "bc",
        "memoryoptimized" => "mo",
        other => other,
    }
}

fn compute_from(caps: &Captures<'_>, tier: String) -> Option<DatabaseCompute> {
    Some(DatabaseCompute {
        tier,
        generation: caps.get(2)?.as_str().parse().ok()?,
        vcore: caps.get(3)?.as_str().parse().ok()?,
    })
}

impl DatabaseDecoder {
    /// MySQL, MariaDB and PostgreSQL offers.
    pub fn open_source() -> CatalogResult<Self> {
        let storage = RuleTable::new()
            .rule(&format!("{OPEN_SOURCE_PREFIX}backup-(lrs|grs)"), |caps| {
                Some(vec![format!("db-backup-{}", caps.get(2)?.as_str())])
            })?
            .rule(&format!("{OPEN_SOURCE_PREFIX}storage"), |caps| {
                let code = if caps.get(1)?.as_str() == "basic" {
                    "db-standard"
                } else {
                    "db-premium"
                };
                Some(vec![code.to_string()])
            })?;
        let compute = RuleTable::new().rule(
            &format!("{OPEN_SOURCE_PREFIX}compute-g(\\d+)-(\\d+)"),
            |caps| compute_from(caps, short_tier(caps.get(1)?.as_str()).to_string()),
        )?;
        Ok(Self {
            storage,
            compute,
            tier_names: Vec::new(),
        })
    }

    /// SQL Server elastic vCore offers.
    pub fn sql_server() -> CatalogResult<Self> {
        let storage = RuleTable::new()
            .rule(&format!("{SQL_PREFIX}backup"), |_| {
                Some(vec!["db-backup-lrs".to_string()])
            })?
            .rule("managed-instance-pitr-backup-storage-ra-grs", |_| {
                Some(vec!["db-backup-grs".to_string()])
            })?
            .rule(&format!("{SQL_PREFIX}general-purpose-storage"), |_| {
                Some(vec!["sql-gp".to_string()])
            })?
            .rule(&format!("{SQL_PREFIX}business-critical-storage"), |_| {
                Some(
                    ["sql-bc-4", "sql-bc-5", "sql-bc-5-8", "sql-bc-5-24"]
                        .map(String::from)
                        .to_vec(),
                )
            })?;
        let compute = RuleTable::new().rule(
            &format!("{SQL_PREFIX}(business-critical|general-purpose)-gen(\\d+)-(\\d+)(-.*)?"),
            |caps| compute_from(caps, format!("sql-{}", short_tier(caps.get(1)?.as_str()))),
        )?;
        Ok(Self {
            storage,
            compute,
            tier_names: vec![
                ("sql-gp".to_string(), "General Purpose".to_string()),
                ("sql-bc".to_string(), "Business Critical".to_string()),
            ],
        })
    }

    /// Classify an offer; storage offers are those priced per GiB.
    pub fn classify(&self, offer_id: &str, priced_per_gb: bool) -> Option<DatabaseOfferRole> {
        if priced_per_gb {
            self.storage
                .decode(offer_id)
                .map(|type_codes| DatabaseOfferRole::Storage { type_codes })
        } else {
            self.compute
                .decode(offer_id)
                .map(DatabaseOfferRole::Compute)
        }
    }
}

/// SKUs outside the vCore purchase model.
pub fn is_ignored_database_sku(sku: &str) -> bool {
    sku.contains("-software-")
        || sku.contains("-dtu-")
        || sku.starts_with("hyperscale")
        || sku.starts_with("managed")
}

/// Attributes of a virtual machine offer id `<os>-<size>-<tier>[-lowpriority]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmOfferKey {
    pub os: Option<VmOs>,
    pub size: String,
    pub basic: bool,
    pub low_priority: bool,
}

impl VmOfferKey {
    pub fn parse(offer_id: &str) -> Option<Self> {
        let parts: Vec<&str> = offer_id.split('-').collect();
        let size = parts.get(1).filter(|s| !s.is_empty())?;
        let trimmed = offer_id.replace("-lowpriority", "");
        Some(Self {
            os: VmOs::from_parts(parts.iter().copied()),
            size: size.to_string(),
            basic: trimmed.ends_with("-basic"),
            low_priority: offer_id.contains("-lowpriority"),
        })
    }

    /// Instance type code: lowercase size, `-b` suffixed for the basic tier.
    pub fn type_code(&self) -> String {
        let code = self.size.to_lowercase();
        if self.basic { format!("{code}-b") } else { code }
    }
}

/// Role of a managed disk offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskRole {
    /// Per-region transaction costs shared by standard disks
    Transactions,
    Ignored,
    Snapshot { code: String },
    Disk { code: String, premium: bool, standard: bool },
}

/// Ordered managed disk rules.
pub fn disk_rules() -> CatalogResult<RuleTable<DiskRole>> {
    fn disk(caps: &Captures<'_>, code: &str) -> Option<DiskRole> {
        let name = caps.get(0)?.as_str();
        Some(DiskRole::Disk {
            code: code.to_string(),
            premium: name.starts_with("premium"),
            standard: name.starts_with("standard"),
        })
    }

    RuleTable::new()
        .rule("transactions", |_| Some(DiskRole::Transactions))?
        .rule("ultrassd.*", |_| Some(DiskRole::Ignored))?
        .rule(".*snapshot", |caps| {
            Some(DiskRole::Snapshot {
                code: caps.get(0)?.as_str().to_string(),
            })
        })?
        .rule("(standardssd|standardhdd|premiumssd)-(.+)", |caps| {
            disk(caps, caps.get(2)?.as_str())
        })?
        .rule(".+", |caps| disk(caps, caps.get(0)?.as_str()))
}

/// Component reference `<offerId>--<dimension>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentRef<'a> {
    pub offer: &'a str,
    pub dimension: &'a str,
}

impl<'a> ComponentRef<'a> {
    pub fn parse(component: &'a str) -> Result<Self, ComponentError> {
        let mut parts = component.split("--");
        match (parts.next(), parts.next(), parts.next()) {
            (Some(offer), Some(dimension), None) if !offer.is_empty() && !dimension.is_empty() => {
                Ok(Self { offer, dimension })
            }
            _ => Err(ComponentError::InvalidShape(component.to_string())),
        }
    }
}
