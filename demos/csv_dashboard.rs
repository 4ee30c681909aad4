use anyhow::{Context, Result};
use chrono::NaiveDate;
use ledger_analytics::{
    format_currency, AnalyticsConfig, CellValue, ColumnMapping, LedgerAnalytics, RawRow,
    RawTable, RecordFilter, StoreType,
};
use std::fs::File;
use std::io::Write;

// Exported with different header spellings than the canonical ones.
const SAMPLE_LEDGER: &str = "\
會計日期,科目代碼,科目名稱,項目代碼1,項目名稱1,核算組織名稱,摘要,借方,貸方
2024-01-05,4101,銷貨收入,A004-002-01,台北營業處,ACME,一月營收,0,\"185,000\"
2024-01-08,5101,進貨成本,A004-002-01,台北營業處,ACME,一月進貨,\"92,500\",0
2024-01-31,6101,租金支出,A004-002-01,台北營業處,ACME,一月租金,\"30,000\",0
2024-02-03,4101,銷貨收入,B004-001-07,台南加盟店,ACME,二月營收,0,\"64,000\"
2024-02-10,6201,薪資支出,B004-001-07,台南加盟店,ACME,二月薪資,\"71,000\",0
2024-02-15,7101,利息收入,H004-000,社福本部,ACME Foundation,利息,0,\"1,200\"
2024-03-01,4102,勞務收入,K004-006-3,高雄營業處,ACME,三月勞務,0,\"48,000\"
,6301,雜項支出,X999,未知部門,ACME,無日期,\"2,500\",0
";

fn load_table(source: &str) -> Result<RawTable> {
    let mut reader = csv::Reader::from_reader(source.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV header row")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("reading CSV row")?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, cell)| {
                let value = if cell.trim().is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::from(cell)
                };
                (header.clone(), value)
            })
            .collect();
        rows.push(row);
    }

    Ok(RawTable::new(headers, rows)?)
}

fn main() -> Result<()> {
    let source = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?,
        None => SAMPLE_LEDGER.to_string(),
    };

    let table = load_table(&source)?;
    let mapping = ColumnMapping::auto_detect(&table.headers);
    println!("Detected column mapping:");
    println!("{}\n", serde_json::to_string_pretty(&mapping)?);

    let config = AnalyticsConfig {
        column_mapping: mapping,
        fallback_date: NaiveDate::from_ymd_opt(2024, 3, 31),
        ..Default::default()
    };
    let report = LedgerAnalytics::process(&table, &config)?;
    let metrics = &report.metrics;

    println!("=== Dashboard ===");
    println!("Revenue (credit): {}", format_currency(metrics.total_credit));
    println!("Expenses (debit): {}", format_currency(metrics.total_debit));
    println!("Net income:       {}", format_currency(metrics.net_income));
    println!("Profit margin:    {:.2}%", metrics.profit_margin);
    println!("Undated rows:     {}\n", metrics.date_fallbacks);

    println!("Monthly trend:");
    for month in &metrics.monthly {
        println!(
            "  {}  credit {:>10}  debit {:>10}  net {:>10}",
            month.name,
            format_currency(month.credit),
            format_currency(month.debit),
            format_currency(month.net)
        );
    }

    println!("\nRegions:");
    for region in &metrics.regions {
        println!("  {:<6} {}", region.name, format_currency(region.net));
    }

    println!("\nStore types:");
    for share in &metrics.store_type_shares {
        println!(
            "  {} {}",
            share.store_type.local_label(),
            format_currency(share.real_value)
        );
    }

    println!("\n{}", report.statement.to_markdown());

    let (franchise, _) = LedgerAnalytics::reanalyze(
        &report.records,
        &RecordFilter::all().store_type(StoreType::Franchise),
        config.fallback_date,
    );
    println!(
        "Franchise-only net income: {}",
        format_currency(franchise.net_income)
    );

    let mut file = File::create("pl_statement.csv")?;
    file.write_all(report.statement.to_csv().as_bytes())?;
    println!("Statement written to pl_statement.csv");

    Ok(())
}
