//! Dashboard filters and the detail-table search/sort over enriched records.

use crate::ingestion::CanonicalField;
use crate::schema::{EnrichedRecord, StoreType};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// `None` in any field means "all".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub company: Option<String>,
    pub region: Option<String>,
    pub store_type: Option<StoreType>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn store_type(mut self, store_type: StoreType) -> Self {
        self.store_type = Some(store_type);
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.company.is_none() && self.region.is_none() && self.store_type.is_none()
    }

    pub fn matches(&self, record: &EnrichedRecord) -> bool {
        self.company
            .as_ref()
            .map_or(true, |c| record.record.company_name == *c)
            && self.region.as_ref().map_or(true, |r| record.region == *r)
            && self.store_type.map_or(true, |s| record.store_type == s)
    }

    pub fn apply(&self, records: &[EnrichedRecord]) -> Vec<EnrichedRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

/// Choices offered by the dashboard filter bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub companies: Vec<String>,
    pub regions: Vec<String>,
    pub store_types: Vec<StoreType>,
}

impl FilterOptions {
    /// Distinct non-empty companies and regions, in first-appearance order.
    pub fn from_records(records: &[EnrichedRecord]) -> Self {
        Self {
            companies: distinct(records.iter().map(|r| r.record.company_name.as_str())),
            regions: distinct(records.iter().map(|r| r.region.as_str())),
            store_types: StoreType::ALL.to_vec(),
        }
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| !v.is_empty() && seen.insert(*v))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: CanonicalField,
    pub direction: SortDirection,
}

/// Case-insensitive "contains" test against one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCondition {
    pub column: CanonicalField,
    pub value: String,
}

impl SearchCondition {
    pub fn new(column: CanonicalField, value: impl Into<String>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &EnrichedRecord) -> bool {
        column_text(record, self.column)
            .to_lowercase()
            .contains(&self.value.to_lowercase())
    }
}

/// The detail table's search conditions (all must hold) and sort order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableQuery {
    pub conditions: Vec<SearchCondition>,
    pub sort: Option<SortSpec>,
}

impl TableQuery {
    /// Blank values are ignored, like an empty search box.
    pub fn add_condition(&mut self, column: CanonicalField, value: &str) {
        if !value.trim().is_empty() {
            self.conditions.push(SearchCondition::new(column, value));
        }
    }

    /// Clicking the active column flips direction; any other column starts
    /// ascending.
    pub fn toggle_sort(&mut self, column: CanonicalField) {
        self.sort = Some(match self.sort {
            Some(SortSpec {
                column: current,
                direction: SortDirection::Ascending,
            }) if current == column => SortSpec {
                column,
                direction: SortDirection::Descending,
            },
            _ => SortSpec {
                column,
                direction: SortDirection::Ascending,
            },
        });
    }

    pub fn run<'a>(&self, records: &'a [EnrichedRecord]) -> Vec<&'a EnrichedRecord> {
        let mut rows: Vec<&EnrichedRecord> = records
            .iter()
            .filter(|r| self.conditions.iter().all(|c| c.matches(r)))
            .collect();

        if let Some(sort) = self.sort {
            rows.sort_by(|a, b| {
                let ordering = compare_column(a, b, sort.column);
                match sort.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }

        rows
    }
}

fn compare_column(a: &EnrichedRecord, b: &EnrichedRecord, column: CanonicalField) -> Ordering {
    match column {
        CanonicalField::Date => a.record.date.cmp(&b.record.date),
        CanonicalField::Debit => a.record.debit.total_cmp(&b.record.debit),
        CanonicalField::Credit => a.record.credit.total_cmp(&b.record.credit),
        _ => column_text(a, column).cmp(&column_text(b, column)),
    }
}

fn column_text(record: &EnrichedRecord, column: CanonicalField) -> String {
    let r = &record.record;
    match column {
        CanonicalField::Date => r
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        CanonicalField::AccountCode => r.account_code.clone(),
        CanonicalField::AccountName => r.account_name.clone(),
        CanonicalField::DepartmentCode => r.department_code.clone(),
        CanonicalField::DepartmentName => r.department_name.clone(),
        CanonicalField::CompanyName => r.company_name.clone(),
        CanonicalField::Summary => r.summary.clone(),
        CanonicalField::Debit => r.debit.to_string(),
        CanonicalField::Credit => r.credit.to_string(),
        CanonicalField::Project => r.project.clone().unwrap_or_default(),
    }
}
