//! # Ledger Analytics
//!
//! Turns a general-ledger export into dashboard metrics and a
//! profit-and-loss statement.
//!
//! ## Core Concepts
//!
//! - **Raw Table**: Rows keyed by sheet header, as read from a spreadsheet or CSV
//! - **Column Mapping**: Which header feeds each canonical ledger field
//! - **Region Rules**: Ordered wildcard patterns over department codes; first match wins
//! - **Store Type**: Direct-operated when the department name ends with 營業處 or is 社福本部, otherwise franchise
//! - **Metrics**: Totals, monthly trend, top-5 rankings, region and store-type breakdowns
//! - **P&L Statement**: Sections built from account-code prefixes 4 to 7
//!
//! ## Example
//!
//! ```rust,ignore
//! use ledger_analytics::*;
//!
//! let headers: Vec<String> = CanonicalField::ALL.iter().map(|f| f.key().to_string()).collect();
//! let mut row = RawRow::new();
//! row.insert("日期".to_string(), CellValue::from("2024-01-15"));
//! row.insert("科目代號".to_string(), CellValue::from("4101"));
//! row.insert("科目名稱".to_string(), CellValue::from("銷貨收入"));
//! row.insert("部門代號".to_string(), CellValue::from("A004-002-01"));
//! row.insert("部門名稱".to_string(), CellValue::from("台北營業處"));
//! row.insert("貸方金額".to_string(), CellValue::from(1000.0));
//!
//! let table = RawTable::new(headers, vec![row]).unwrap();
//! let report = LedgerAnalytics::process(&table, &AnalyticsConfig::default()).unwrap();
//!
//! assert_eq!(report.metrics.net_income, 1000.0);
//! println!("{}", report.statement.to_markdown());
//! ```

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod error;
pub mod filter;
pub mod ingestion;
pub mod narrative;
pub mod rules;
pub mod schema;
pub mod statement;
pub mod utils;
pub mod wildcard;

#[cfg(feature = "gemini")]
pub mod llm;

pub use aggregator::{
    aggregate, Aggregator, GroupSummary, MarginSummary, MetricsSummary, MonthlyPoint,
    RankedValue, StoreTypeShare, Totals, TOP_N, UNKNOWN_LABEL,
};
pub use classifier::{
    classify, classify_all, ClassificationPreview, Classifier, DEFAULT_PREVIEW_ROWS,
};
pub use config::AnalyticsConfig;
pub use error::{LedgerAnalyticsError, Result};
pub use filter::{
    FilterOptions, RecordFilter, SearchCondition, SortDirection, SortSpec, TableQuery,
};
pub use ingestion::*;
pub use narrative::{
    build_system_prompt, parse_insights, Clock, InsightList, RateLimiter, RequestGate,
    RequestTicket, SystemClock,
};
pub use rules::{CompiledRuleSet, RegionRule, RegionRuleSet};
pub use schema::*;
pub use statement::{
    build_statement, PlStatement, SectionKind, StatementBuilder, StatementLine, StatementSection,
};
pub use utils::*;
pub use wildcard::{wildcard_match, WildcardPattern};

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Everything the dashboard shows for one upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub records: Vec<EnrichedRecord>,
    pub metrics: MetricsSummary,
    pub statement: PlStatement,
    pub filter_options: FilterOptions,
}

pub struct LedgerAnalytics;

impl LedgerAnalytics {
    /// Maps, classifies and aggregates a raw table in one pass.
    pub fn process(table: &RawTable, config: &AnalyticsConfig) -> Result<AnalysisReport> {
        config.validate()?;
        config.column_mapping.validate(&table.headers)?;

        info!(
            "Processing ledger export with {} rows and {} columns",
            table.len(),
            table.headers.len()
        );

        let records = config.column_mapping.project(table)?;
        let classifier = Classifier::new(&config.region_rules)?;
        let enriched = classifier.classify_all(&records);

        let (metrics, statement) =
            Self::reanalyze(&enriched, &RecordFilter::all(), config.fallback_date);
        let filter_options = FilterOptions::from_records(&enriched);

        debug!(
            "{} companies, {} regions available for filtering",
            filter_options.companies.len(),
            filter_options.regions.len()
        );
        if metrics.date_fallbacks > 0 {
            info!(
                "{} records had no usable date and were bucketed under the fallback date",
                metrics.date_fallbacks
            );
        }

        Ok(AnalysisReport {
            records: enriched,
            metrics,
            statement,
            filter_options,
        })
    }

    /// Recomputes metrics and statement for a filtered view of already
    /// classified records.
    pub fn reanalyze(
        records: &[EnrichedRecord],
        filter: &RecordFilter,
        fallback_date: Option<NaiveDate>,
    ) -> (MetricsSummary, PlStatement) {
        let aggregator = match fallback_date {
            Some(date) => Aggregator::with_fallback_date(date),
            None => Aggregator::new(),
        };
        debug!(
            "Undated records fall back to {}",
            aggregator.fallback_date()
        );

        if filter.is_unfiltered() {
            return (
                aggregator.aggregate(records),
                StatementBuilder::build(records),
            );
        }

        let filtered = filter.apply(records);
        debug!(
            "Filter kept {} of {} records",
            filtered.len(),
            records.len()
        );
        (
            aggregator.aggregate(&filtered),
            StatementBuilder::build(&filtered),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RawTable {
        let headers: Vec<String> = [
            "日期", "科目代號", "科目名稱", "部門代號", "部門名稱", "公司名稱", "摘要", "借方", "貸方",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect();

        let rows = vec![
            ("2024-01-15", "4101", "銷貨收入", "A004-002-01", "台北營業處", "ACME", 0.0, 1000.0),
            ("2024-01-20", "6101", "租金", "A004-002-01", "台北營業處", "ACME", 300.0, 0.0),
            ("2024-02-03", "4101", "銷貨收入", "B004-001", "台南加盟店", "Globex", 0.0, 500.0),
            ("", "5101", "進貨", "Z999", "社福本部", "Globex", 200.0, 0.0),
        ]
        .into_iter()
        .map(|(date, code, name, dept_code, dept_name, company, debit, credit)| {
            let mut row = RawRow::new();
            row.insert("日期".to_string(), CellValue::from(date));
            row.insert("科目代號".to_string(), CellValue::from(code));
            row.insert("科目名稱".to_string(), CellValue::from(name));
            row.insert("部門代號".to_string(), CellValue::from(dept_code));
            row.insert("部門名稱".to_string(), CellValue::from(dept_name));
            row.insert("公司名稱".to_string(), CellValue::from(company));
            row.insert("借方".to_string(), CellValue::from(debit));
            row.insert("貸方".to_string(), CellValue::from(credit));
            row
        })
        .collect();

        RawTable::new(headers, rows).unwrap()
    }

    fn config() -> AnalyticsConfig {
        AnalyticsConfig {
            column_mapping: ColumnMapping::auto_detect(&table().headers),
            fallback_date: NaiveDate::from_ymd_opt(2024, 3, 31),
            ..Default::default()
        }
    }

    #[test]
    fn test_end_to_end_processing() {
        let report = LedgerAnalytics::process(&table(), &config()).unwrap();

        assert_eq!(report.records.len(), 4);
        assert_eq!(report.metrics.total_credit, 1500.0);
        assert_eq!(report.metrics.total_debit, 500.0);
        assert_eq!(report.metrics.net_income, 1000.0);
        assert_eq!(report.metrics.date_fallbacks, 1);

        let months: Vec<&str> = report.metrics.monthly.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(months, vec!["Jan 24", "Feb 24", "Mar 24"]);

        assert_eq!(report.records[0].region, "台北區");
        assert_eq!(report.records[2].region, "台南區");
        assert_eq!(report.records[3].region, OTHER_REGION);
        assert_eq!(report.records[3].store_type, StoreType::DirectOperated);

        assert_eq!(report.statement.net_income, report.metrics.net_income);
        assert_eq!(report.filter_options.companies, vec!["ACME", "Globex"]);
    }

    #[test]
    fn test_reanalyze_with_filter() {
        let report = LedgerAnalytics::process(&table(), &config()).unwrap();

        let (metrics, statement) = LedgerAnalytics::reanalyze(
            &report.records,
            &RecordFilter::all().company("Globex"),
            NaiveDate::from_ymd_opt(2024, 3, 31),
        );
        assert_eq!(metrics.record_count, 2);
        assert_eq!(metrics.net_income, 300.0);
        assert_eq!(statement.revenue.value, 500.0);
        assert_eq!(statement.costs.value, 200.0);

        let (metrics, _) = LedgerAnalytics::reanalyze(
            &report.records,
            &RecordFilter::all().store_type(StoreType::Franchise),
            None,
        );
        assert_eq!(metrics.record_count, 1);
    }

    #[test]
    fn test_incomplete_mapping_is_rejected() {
        let config = AnalyticsConfig {
            column_mapping: ColumnMapping::new().with(CanonicalField::Debit, "借方"),
            ..Default::default()
        };

        assert!(matches!(
            LedgerAnalytics::process(&table(), &config),
            Err(LedgerAnalyticsError::MissingRequiredField { .. })
        ));
    }

    #[test]
    fn test_mapping_to_absent_header_is_rejected() {
        let config = AnalyticsConfig {
            column_mapping: config().column_mapping.with(CanonicalField::Summary, "備註"),
            ..Default::default()
        };

        assert!(matches!(
            LedgerAnalytics::process(&table(), &config),
            Err(LedgerAnalyticsError::UnknownHeader { .. })
        ));
    }
}
