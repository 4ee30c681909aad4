//! The column-mapping boundary between decoded spreadsheet rows and typed
//! [`LedgerRecord`]s.

use crate::error::{LedgerAnalyticsError, Result};
use crate::schema::{CellValue, LedgerRecord};
use crate::utils::parse_date;
use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One decoded row, keyed by the original header strings.
pub type RawRow = HashMap<String, CellValue>;

/// The decoder's output: rows plus the header list in sheet order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<RawRow>) -> Result<Self> {
        if rows.is_empty() {
            return Err(LedgerAnalyticsError::EmptyDataset);
        }
        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Date,
    AccountCode,
    AccountName,
    DepartmentCode,
    DepartmentName,
    CompanyName,
    Summary,
    Debit,
    Credit,
    Project,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 10] = [
        CanonicalField::Date,
        CanonicalField::AccountCode,
        CanonicalField::AccountName,
        CanonicalField::DepartmentCode,
        CanonicalField::DepartmentName,
        CanonicalField::CompanyName,
        CanonicalField::Summary,
        CanonicalField::Debit,
        CanonicalField::Credit,
        CanonicalField::Project,
    ];

    /// The header name this field carries in the standard ledger export.
    pub fn key(&self) -> &'static str {
        match self {
            CanonicalField::Date => "日期",
            CanonicalField::AccountCode => "科目代號",
            CanonicalField::AccountName => "科目名稱",
            CanonicalField::DepartmentCode => "部門代號",
            CanonicalField::DepartmentName => "部門名稱",
            CanonicalField::CompanyName => "公司名稱",
            CanonicalField::Summary => "摘要",
            CanonicalField::Debit => "借方金額",
            CanonicalField::Credit => "貸方金額",
            CanonicalField::Project => "專案",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CanonicalField::Date => "Date",
            CanonicalField::AccountCode => "Account Code",
            CanonicalField::AccountName => "Account Name",
            CanonicalField::DepartmentCode => "Dept Code",
            CanonicalField::DepartmentName => "Department",
            CanonicalField::CompanyName => "Company",
            CanonicalField::Summary => "Summary",
            CanonicalField::Debit => "Debit",
            CanonicalField::Credit => "Credit",
            CanonicalField::Project => "Project",
        }
    }

    pub fn is_required(&self) -> bool {
        !matches!(self, CanonicalField::Project)
    }

    /// Alternative header spellings seen in exports from other systems.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            CanonicalField::Date => &["會計日期", "date", "日期"],
            CanonicalField::AccountCode => &["科目代碼", "account code", "acct code"],
            CanonicalField::DepartmentCode => &["項目代碼1", "dept code"],
            CanonicalField::DepartmentName => &["項目名稱1", "department"],
            CanonicalField::CompanyName => &["核算組織名稱", "company"],
            CanonicalField::Debit => &["借方", "debit"],
            CanonicalField::Credit => &["貸方", "credit"],
            CanonicalField::Project => &["項目名稱2", "project"],
            CanonicalField::AccountName | CanonicalField::Summary => &[],
        }
    }

    fn matches_header(&self, header: &str) -> bool {
        if header == self.key() {
            return true;
        }

        let lower = header.to_lowercase();
        if self.aliases().iter().any(|alias| {
            let alias = alias.to_lowercase();
            lower == alias || lower.contains(&alias)
        }) {
            return true;
        }

        let label = self.label();
        (label.contains("Date") && lower.contains("date"))
            || (label.contains("Account") && lower.contains("account"))
    }
}

/// Which sheet header feeds each canonical field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ColumnMapping {
    pub columns: BTreeMap<CanonicalField, String>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: CanonicalField, header: impl Into<String>) -> Self {
        self.set(field, header);
        self
    }

    pub fn set(&mut self, field: CanonicalField, header: impl Into<String>) {
        self.columns.insert(field, header.into());
    }

    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.columns.get(&field).map(String::as_str)
    }

    /// Guesses a header for every field; for each field the first header (in
    /// sheet order) that matches its key, an alias, or a label keyword wins.
    pub fn auto_detect(headers: &[String]) -> Self {
        let mut mapping = Self::new();

        for field in CanonicalField::ALL {
            if let Some(header) = headers.iter().find(|h| field.matches_header(h)) {
                debug!("Auto-mapped {:?} to header '{}'", field, header);
                mapping.set(field, header.clone());
            }
        }

        mapping
    }

    /// Identity mapping for exports that already use the canonical headers.
    pub fn canonical() -> Self {
        CanonicalField::ALL
            .iter()
            .fold(Self::new(), |mapping, field| mapping.with(*field, field.key()))
    }

    pub fn missing_required(&self) -> Vec<CanonicalField> {
        CanonicalField::ALL
            .into_iter()
            .filter(|f| f.is_required())
            .filter(|f| self.get(*f).map_or(true, str::is_empty))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }

    pub fn validate(&self, headers: &[String]) -> Result<()> {
        if let Some(field) = self.missing_required().first() {
            return Err(LedgerAnalyticsError::MissingRequiredField {
                field: field.key().to_string(),
            });
        }

        for (field, header) in &self.columns {
            if !header.is_empty() && !headers.iter().any(|h| h == header) {
                return Err(LedgerAnalyticsError::UnknownHeader {
                    field: field.key().to_string(),
                    header: header.clone(),
                });
            }
        }

        Ok(())
    }

    /// Validates the mapping against the table and converts every row.
    pub fn project(&self, table: &RawTable) -> Result<Vec<LedgerRecord>> {
        self.validate(&table.headers)?;

        let records: Vec<LedgerRecord> = table.rows.iter().map(|row| self.project_row(row)).collect();

        let undated = records.iter().filter(|r| r.date.is_none()).count();
        info!(
            "Projected {} rows into ledger records ({} without a usable date)",
            records.len(),
            undated
        );

        Ok(records)
    }

    pub fn project_row(&self, row: &RawRow) -> LedgerRecord {
        let text = |field: CanonicalField| {
            self.cell(row, field)
                .map(CellValue::to_display_string)
                .unwrap_or_default()
        };
        let amount = |field: CanonicalField| self.cell(row, field).map_or(0.0, CellValue::to_amount);

        let project = text(CanonicalField::Project);

        LedgerRecord {
            date: self.cell(row, CanonicalField::Date).and_then(parse_date),
            account_code: text(CanonicalField::AccountCode),
            account_name: text(CanonicalField::AccountName),
            department_code: text(CanonicalField::DepartmentCode),
            department_name: text(CanonicalField::DepartmentName),
            company_name: text(CanonicalField::CompanyName),
            summary: text(CanonicalField::Summary),
            debit: amount(CanonicalField::Debit),
            credit: amount(CanonicalField::Credit),
            project: if project.is_empty() { None } else { Some(project) },
        }
    }

    fn cell<'a>(&self, row: &'a RawRow, field: CanonicalField) -> Option<&'a CellValue> {
        self.get(field).and_then(|header| row.get(header))
    }
}
