use crate::error::Result;
use crate::rules::{CompiledRuleSet, RegionRuleSet};
use crate::schema::{EnrichedRecord, LedgerRecord, StoreType, OTHER_REGION};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of sample rows shown while editing region rules.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Assigns region and store type to ledger records using a compiled rule set.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: CompiledRuleSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationPreview {
    pub department_code: String,
    pub department_name: String,
    pub region: String,
}

impl Classifier {
    pub fn new(rule_set: &RegionRuleSet) -> Result<Self> {
        Ok(Self {
            rules: rule_set.compile()?,
        })
    }

    pub fn region_for(&self, department_code: &str) -> String {
        self.rules
            .region_for(department_code)
            .unwrap_or(OTHER_REGION)
            .to_string()
    }

    pub fn classify(&self, record: &LedgerRecord) -> EnrichedRecord {
        EnrichedRecord {
            record: record.clone(),
            region: self.region_for(&record.department_code),
            store_type: StoreType::from_department_name(&record.department_name),
        }
    }

    pub fn classify_all(&self, records: &[LedgerRecord]) -> Vec<EnrichedRecord> {
        let enriched: Vec<EnrichedRecord> = records.iter().map(|r| self.classify(r)).collect();

        if log::log_enabled!(log::Level::Debug) {
            let mut per_region: HashMap<&str, usize> = HashMap::new();
            for record in &enriched {
                *per_region.entry(record.region.as_str()).or_default() += 1;
            }
            debug!(
                "Classified {} records into {} regions: {:?}",
                enriched.len(),
                per_region.len(),
                per_region
            );
        }

        enriched
    }

    /// How the first `limit` records would be classified, for rule editing.
    pub fn preview(&self, records: &[LedgerRecord], limit: usize) -> Vec<ClassificationPreview> {
        records
            .iter()
            .take(limit)
            .map(|record| ClassificationPreview {
                department_code: record.department_code.clone(),
                department_name: record.department_name.clone(),
                region: self.region_for(&record.department_code),
            })
            .collect()
    }
}

/// Classifies one record, compiling the rule set on the way.
pub fn classify(record: &LedgerRecord, rule_set: &RegionRuleSet) -> Result<EnrichedRecord> {
    Ok(Classifier::new(rule_set)?.classify(record))
}

pub fn classify_all(
    records: &[LedgerRecord],
    rule_set: &RegionRuleSet,
) -> Result<Vec<EnrichedRecord>> {
    Ok(Classifier::new(rule_set)?.classify_all(records))
}
