use crate::error::{LedgerAnalyticsError, Result};
use crate::ingestion::ColumnMapping;
use crate::rules::RegionRuleSet;
use chrono::NaiveDate;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything a user configures between upload and dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalyticsConfig {
    #[schemars(
        description = "Sheet header chosen for each canonical ledger field. Keys: date, account_code, account_name, department_code, department_name, company_name, summary, debit, credit, project (optional)."
    )]
    #[serde(default)]
    pub column_mapping: ColumnMapping,

    #[schemars(
        description = "Ordered [region, [patterns...]] pairs. '*' matches any run of characters; the first matching pattern in list order decides the region."
    )]
    #[serde(default = "RegionRuleSet::default_rules")]
    pub region_rules: RegionRuleSet,

    #[schemars(
        description = "Date used for rows without a usable date. Defaults to the current date when omitted."
    )]
    #[serde(default)]
    pub fallback_date: Option<NaiveDate>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            column_mapping: ColumnMapping::canonical(),
            region_rules: RegionRuleSet::default_rules(),
            fallback_date: None,
        }
    }
}

impl AnalyticsConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading analytics config from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects rule sets whose patterns cannot be compiled and duplicate
    /// region names that differ only in surrounding whitespace.
    pub fn validate(&self) -> Result<()> {
        self.region_rules.compile()?;

        let mut seen: Vec<&str> = Vec::new();
        for name in self.region_rules.region_names() {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(LedgerAnalyticsError::InvalidConfig(
                    "region name must not be blank".to_string(),
                ));
            }
            if seen.contains(&trimmed) {
                return Err(LedgerAnalyticsError::InvalidConfig(format!(
                    "region '{}' is defined more than once",
                    trimmed
                )));
            }
            seen.push(trimmed);
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AnalyticsConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::generate_json_schema())
    }
}
