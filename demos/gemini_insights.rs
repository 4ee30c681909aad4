use chrono::NaiveDate;
use dotenv::dotenv;
use ledger_analytics::llm::{GeminiClient, NarrativeAssistant};
use ledger_analytics::{classify_all, Aggregator, LedgerRecord, RegionRuleSet};
use std::error::Error;

fn entry(
    date: (i32, u32, u32),
    code: &str,
    name: &str,
    dept: (&str, &str),
    debit: f64,
    credit: f64,
) -> LedgerRecord {
    LedgerRecord {
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
        account_code: code.to_string(),
        account_name: name.to_string(),
        department_code: dept.0.to_string(),
        department_name: dept.1.to_string(),
        company_name: "ACME".to_string(),
        debit,
        credit,
        ..Default::default()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| "GEMINI_API_KEY must be set")?;

    let taipei = ("A004-002-01", "台北營業處");
    let tainan = ("B004-001-07", "台南加盟店");
    let records = vec![
        entry((2024, 1, 5), "4101", "銷貨收入", taipei, 0.0, 185_000.0),
        entry((2024, 1, 8), "5101", "進貨成本", taipei, 92_500.0, 0.0),
        entry((2024, 1, 31), "6101", "租金支出", taipei, 30_000.0, 0.0),
        entry((2024, 2, 3), "4101", "銷貨收入", tainan, 0.0, 64_000.0),
        entry((2024, 2, 10), "6201", "薪資支出", tainan, 71_000.0, 0.0),
    ];

    let enriched = classify_all(&records, &RegionRuleSet::default_rules())?;
    let summary = Aggregator::new().aggregate(&enriched);

    let assistant = NarrativeAssistant::new(GeminiClient::new(api_key));

    println!("Generating insights...");
    let insights = assistant.generate_insights(&summary).await?;
    for (i, insight) in insights.0.iter().enumerate() {
        println!("{}. {}", i + 1, insight);
    }

    let question = "台南加盟店為什麼虧損?";
    println!("\nQ: {}", question);
    let answer = assistant.ask_question(&summary, question).await?;
    println!("A: {}", answer);

    Ok(())
}
