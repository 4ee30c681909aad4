use chrono::{NaiveDate, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Region assigned when no configured pattern matches a department code.
pub const OTHER_REGION: &str = "Other";

/// Department-name suffix marking a company-run business office (營業處).
pub const DIRECT_OFFICE_SUFFIX: &str = "營業處";

/// Department-name fragment marking the social welfare headquarters (社福本部).
pub const SOCIAL_WELFARE_HQ: &str = "社福本部";

/// A single decoded spreadsheet cell, as handed over by the workbook decoder.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

impl CellValue {
    /// True for the values a spreadsheet user would consider "blank": empty
    /// cells, empty strings, zero and `false`.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            CellValue::Number(n) => *n == 0.0 || n.is_nan(),
            CellValue::Bool(b) => !b,
            CellValue::Date(_) => false,
        }
    }

    /// Renders the cell the way it reads in the sheet. Whole numbers drop the
    /// fractional part so that numeric account codes stay `"4001"`.
    pub fn to_display_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            CellValue::Bool(b) => b.to_string(),
            CellValue::Date(dt) => {
                if dt.time() == chrono::NaiveTime::MIN {
                    dt.date().format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }
        }
    }

    /// Numeric coercion for debit/credit columns. Anything that is not a
    /// finite number becomes 0.
    pub fn to_amount(&self) -> f64 {
        let value = match self {
            CellValue::Number(n) => *n,
            CellValue::Text(s) => {
                let cleaned: String = s
                    .trim()
                    .chars()
                    .filter(|c| *c != ',' && !c.is_whitespace())
                    .collect();
                if cleaned.is_empty() {
                    0.0
                } else {
                    cleaned.parse::<f64>().unwrap_or(0.0)
                }
            }
            CellValue::Bool(true) => 1.0,
            CellValue::Bool(false) | CellValue::Empty | CellValue::Date(_) => 0.0,
        };

        if value.is_finite() {
            value
        } else {
            0.0
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value.and_time(chrono::NaiveTime::MIN))
    }
}

/// One accounting line item after the column-mapping boundary.
///
/// Text fields that were blank in the export are empty strings; amounts that
/// were blank or non-numeric are 0. A `date` of `None` means the source cell
/// was missing or unparsable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct LedgerRecord {
    pub date: Option<NaiveDate>,
    pub account_code: String,
    pub account_name: String,
    pub department_code: String,
    pub department_name: String,
    pub company_name: String,
    pub summary: String,
    pub debit: f64,
    pub credit: f64,
    #[serde(default)]
    pub project: Option<String>,
}

impl LedgerRecord {
    /// Signed contribution of this line to net income.
    pub fn net(&self) -> f64 {
        self.credit - self.debit
    }

    pub fn account_prefix(&self) -> Option<char> {
        self.account_code.chars().next()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum StoreType {
    #[serde(rename = "Direct-operated")]
    #[schemars(description = "Company-run location: a business office (營業處) or the social welfare HQ (社福本部)")]
    DirectOperated,

    #[serde(rename = "Franchise")]
    #[schemars(description = "Any other department")]
    Franchise,
}

impl StoreType {
    pub const ALL: [StoreType; 2] = [StoreType::DirectOperated, StoreType::Franchise];

    /// Derives the store type from the department name alone.
    pub fn from_department_name(department_name: &str) -> Self {
        if department_name.ends_with(DIRECT_OFFICE_SUFFIX)
            || department_name.contains(SOCIAL_WELFARE_HQ)
        {
            StoreType::DirectOperated
        } else {
            StoreType::Franchise
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StoreType::DirectOperated => "Direct-operated",
            StoreType::Franchise => "Franchise",
        }
    }

    /// Display name used in the Traditional Chinese dashboards.
    pub fn local_label(&self) -> &'static str {
        match self {
            StoreType::DirectOperated => "直營店",
            StoreType::Franchise => "加盟店",
        }
    }
}

impl fmt::Display for StoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A ledger record with its derived classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub record: LedgerRecord,
    pub region: String,
    pub store_type: StoreType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_type_heuristic() {
        assert_eq!(
            StoreType::from_department_name("台北營業處"),
            StoreType::DirectOperated
        );
        assert_eq!(
            StoreType::from_department_name("社福本部A"),
            StoreType::DirectOperated
        );
        assert_eq!(
            StoreType::from_department_name("台北加盟點"),
            StoreType::Franchise
        );
        assert_eq!(
            StoreType::from_department_name("營業處台北"),
            StoreType::Franchise
        );
        assert_eq!(StoreType::from_department_name(""), StoreType::Franchise);
    }

    #[test]
    fn test_amount_coercion() {
        assert_eq!(CellValue::Number(12.5).to_amount(), 12.5);
        assert_eq!(CellValue::from("1,234.50").to_amount(), 1234.5);
        assert_eq!(CellValue::from("n/a").to_amount(), 0.0);
        assert_eq!(CellValue::from("").to_amount(), 0.0);
        assert_eq!(CellValue::Empty.to_amount(), 0.0);
        assert_eq!(CellValue::Number(f64::NAN).to_amount(), 0.0);
    }

    #[test]
    fn test_display_string_keeps_codes_integral() {
        assert_eq!(CellValue::Number(4001.0).to_display_string(), "4001");
        assert_eq!(CellValue::Number(1.5).to_display_string(), "1.5");
        assert_eq!(CellValue::from("A-01").to_display_string(), "A-01");
        assert_eq!(CellValue::Empty.to_display_string(), "");
    }

    #[test]
    fn test_record_net_and_prefix() {
        let record = LedgerRecord {
            account_code: "6101".to_string(),
            debit: 250.0,
            credit: 100.0,
            ..Default::default()
        };
        assert_eq!(record.net(), -150.0);
        assert_eq!(record.account_prefix(), Some('6'));
        assert_eq!(LedgerRecord::default().account_prefix(), None);
    }

    #[test]
    fn test_store_type_serialization() {
        let json = serde_json::to_string(&StoreType::DirectOperated).unwrap();
        assert_eq!(json, "\"Direct-operated\"");
        let back: StoreType = serde_json::from_str("\"Franchise\"").unwrap();
        assert_eq!(back, StoreType::Franchise);
    }

    #[test]
    fn test_enriched_record_flattens_fields() {
        let enriched = EnrichedRecord {
            record: LedgerRecord {
                account_code: "4001".to_string(),
                credit: 10.0,
                ..Default::default()
            },
            region: OTHER_REGION.to_string(),
            store_type: StoreType::Franchise,
        };

        let value = serde_json::to_value(&enriched).unwrap();
        assert_eq!(value["account_code"], "4001");
        assert_eq!(value["region"], "Other");
        assert_eq!(value["store_type"], "Franchise");
    }
}
