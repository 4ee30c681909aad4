use chrono::NaiveDate;
use ledger_analytics::*;
use proptest::prelude::*;

fn record(
    account_code: &str,
    department_code: &str,
    department_name: &str,
    debit: f64,
    credit: f64,
) -> LedgerRecord {
    LedgerRecord {
        date: NaiveDate::from_ymd_opt(2024, 1, 15),
        account_code: account_code.to_string(),
        account_name: format!("Account {}", account_code),
        department_code: department_code.to_string(),
        department_name: department_name.to_string(),
        company_name: "ACME".to_string(),
        debit,
        credit,
        ..Default::default()
    }
}

fn enrich(records: &[LedgerRecord]) -> Vec<EnrichedRecord> {
    classify_all(records, &RegionRuleSet::default_rules()).unwrap()
}

fn fixed_aggregator() -> Aggregator {
    Aggregator::with_fallback_date(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
}

#[test]
fn test_wildcard_anchoring() {
    assert!(wildcard_match("A*", "ABC").unwrap());
    assert!(wildcard_match("A*", "A").unwrap());
    assert!(!wildcard_match("A*", "XA").unwrap());
    assert!(wildcard_match("*004-001*", "X004-001Y").unwrap());
    assert!(wildcard_match("10", "10").unwrap());
    assert!(!wildcard_match("10", "100").unwrap());
    assert!(!wildcard_match("10", "010").unwrap());
}

#[test]
fn test_first_match_wins_across_regions() {
    let rules = RegionRuleSet::new()
        .with_rule("R1", ["10*"])
        .with_rule("R2", ["1*"]);

    let enriched = classify(&record("4001", "105", "", 0.0, 1.0), &rules).unwrap();
    assert_eq!(enriched.region, "R1");

    let enriched = classify(&record("4001", "199", "", 0.0, 1.0), &rules).unwrap();
    assert_eq!(enriched.region, "R2");

    let enriched = classify(&record("4001", "299", "", 0.0, 1.0), &rules).unwrap();
    assert_eq!(enriched.region, OTHER_REGION);
}

#[test]
fn test_store_type_determinism() {
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
}

#[test]
fn test_classification_leaves_input_untouched() {
    let original = record("6101", "A004-003-9", "新竹營業處", 120.0, 0.0);
    let enriched = classify(&original, &RegionRuleSet::default_rules()).unwrap();

    assert_eq!(enriched.record, original);
    assert_eq!(enriched.region, "新竹區");
    assert_eq!(enriched.store_type, StoreType::DirectOperated);
}

#[test]
fn test_revenue_and_cost_scenario() {
    let records = enrich(&[
        record("4001", "", "", 0.0, 1000.0),
        record("5001", "", "", 400.0, 0.0),
    ]);
    let statement = build_statement(&records);

    assert_eq!(statement.revenue.value, 1000.0);
    assert_eq!(statement.costs.value, 400.0);
    assert_eq!(statement.gross_profit, 600.0);
    assert_eq!(statement.operating_income, 600.0);
    assert_eq!(statement.net_income, 600.0);
}

#[test]
fn test_zero_credit_department_never_ranked_by_margin() {
    let records = enrich(&[
        record("6101", "A004-001", "台南加盟店", 5000.0, 0.0),
        record("4101", "A004-002", "台北營業處", 500.0, 1000.0),
    ]);
    let metrics = fixed_aggregator().aggregate(&records);

    let names: Vec<&str> = metrics
        .top_margin_departments
        .iter()
        .map(|d| d.name.as_str())
        .collect();
    assert_eq!(names, vec!["台北營業處"]);
    assert_eq!(metrics.top_margin_departments[0].margin, 50.0);

    assert!(metrics
        .top_profit_departments
        .iter()
        .any(|d| d.name == "台南加盟店"));
}

#[test]
fn test_pipeline_from_raw_rows() {
    let headers: Vec<String> = CanonicalField::ALL
        .iter()
        .map(|f| f.key().to_string())
        .collect();

    let mut sales = RawRow::new();
    sales.insert("日期".to_string(), CellValue::Number(45306.0));
    sales.insert("科目代號".to_string(), CellValue::from("4101"));
    sales.insert("科目名稱".to_string(), CellValue::from("銷貨收入"));
    sales.insert("部門代號".to_string(), CellValue::from("K004-006-2"));
    sales.insert("部門名稱".to_string(), CellValue::from("高雄營業處"));
    sales.insert("公司名稱".to_string(), CellValue::from("ACME"));
    sales.insert("貸方金額".to_string(), CellValue::from("12,500"));

    let mut rent = RawRow::new();
    rent.insert("日期".to_string(), CellValue::from("not a date"));
    rent.insert("科目代號".to_string(), CellValue::from("6201"));
    rent.insert("科目名稱".to_string(), CellValue::from("租金支出"));
    rent.insert("部門代號".to_string(), CellValue::from("K004-006-2"));
    rent.insert("部門名稱".to_string(), CellValue::from("高雄營業處"));
    rent.insert("公司名稱".to_string(), CellValue::from("ACME"));
    rent.insert("借方金額".to_string(), CellValue::from(2500.0));

    let table = RawTable::new(headers, vec![sales, rent]).unwrap();
    let config = AnalyticsConfig {
        fallback_date: NaiveDate::from_ymd_opt(2024, 6, 30),
        ..Default::default()
    };

    let report = LedgerAnalytics::process(&table, &config).unwrap();

    assert_eq!(report.metrics.total_credit, 12_500.0);
    assert_eq!(report.metrics.total_debit, 2_500.0);
    assert_eq!(report.metrics.profit_margin, 80.0);
    assert_eq!(report.metrics.date_fallbacks, 1);

    let months: Vec<&str> = report.metrics.monthly.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(months, vec!["Jan 24", "Jun 24"]);

    assert_eq!(report.metrics.regions.len(), 1);
    assert_eq!(report.metrics.regions[0].name, "高雄區");
    assert_eq!(report.statement.expenses.value, 2_500.0);
    assert_eq!(report.statement.net_income, 10_000.0);

    let markdown = report.statement.to_markdown();
    assert!(markdown.contains("營業收入"));
    assert!(markdown.contains("12,500"));
}

#[test]
fn test_region_rules_persist_as_nested_lists() {
    let rules = RegionRuleSet::new()
        .with_rule("North", ["N*", "*-01"])
        .with_rule("South", ["S*"]);

    let json = serde_json::to_string(&rules).unwrap();
    assert_eq!(json, r#"[["North",["N*","*-01"]],["South",["S*"]]]"#);

    let back: RegionRuleSet = serde_json::from_str(&json).unwrap();
    assert_eq!(back, rules);
}

fn arb_record() -> impl Strategy<Value = LedgerRecord> {
    (
        prop::sample::select(vec!["4101", "4102", "5101", "6101", "6102", "7101", "8101", ""]),
        prop::sample::select(vec!["A004-001-1", "A004-002", "Z-9", ""]),
        prop::sample::select(vec!["台北營業處", "台南加盟店", "社福本部", ""]),
        0u32..100_000,
        0u32..100_000,
        prop::option::of(0u32..730),
    )
        .prop_map(|(code, dept_code, dept_name, debit, credit, day)| LedgerRecord {
            date: day.and_then(|d| {
                NaiveDate::from_ymd_opt(2023, 1, 1)
                    .and_then(|start| start.checked_add_days(chrono::Days::new(d as u64)))
            }),
            account_code: code.to_string(),
            account_name: format!("Account {}", code),
            department_code: dept_code.to_string(),
            department_name: dept_name.to_string(),
            debit: debit as f64,
            credit: credit as f64,
            ..Default::default()
        })
}

proptest! {
    #[test]
    fn prop_aggregation_is_additive(
        records in prop::collection::vec(arb_record(), 0..40),
        split in 0usize..40,
    ) {
        let enriched = enrich(&records);
        let split = split.min(enriched.len());
        let (left, right) = enriched.split_at(split);
        let aggregator = fixed_aggregator();

        let whole = aggregator.aggregate(&enriched);
        let a = aggregator.aggregate(left);
        let b = aggregator.aggregate(right);

        prop_assert_eq!(whole.total_debit, a.total_debit + b.total_debit);
        prop_assert_eq!(whole.total_credit, a.total_credit + b.total_credit);
        prop_assert_eq!(whole.record_count, a.record_count + b.record_count);
    }

    #[test]
    fn prop_top_lists_bounded_and_sorted(records in prop::collection::vec(arb_record(), 0..60)) {
        let metrics = fixed_aggregator().aggregate(&enrich(&records));

        prop_assert!(metrics.top_revenue_accounts.len() <= TOP_N);
        prop_assert!(metrics.top_expense_accounts.len() <= TOP_N);
        prop_assert!(metrics.top_profit_departments.len() <= TOP_N);
        prop_assert!(metrics.top_margin_departments.len() <= TOP_N);

        for pair in metrics.top_revenue_accounts.windows(2) {
            prop_assert!(pair[0].value >= pair[1].value);
        }
        for pair in metrics.top_expense_accounts.windows(2) {
            prop_assert!(pair[0].value >= pair[1].value);
        }
        for pair in metrics.regions.windows(2) {
            prop_assert!(pair[0].net >= pair[1].net);
        }
        for department in &metrics.top_margin_departments {
            prop_assert!(department.credit > 0.0);
        }
        for share in &metrics.store_type_shares {
            prop_assert!(share.value > 0.0);
            prop_assert_eq!(share.value, share.real_value.abs());
        }
    }

    #[test]
    fn prop_statement_balances_with_metrics(records in prop::collection::vec(arb_record(), 0..40)) {
        let recognized: Vec<LedgerRecord> = records
            .into_iter()
            .filter(|r| matches!(r.account_prefix(), Some('4'..='7')))
            .collect();
        let enriched = enrich(&recognized);

        let statement = build_statement(&enriched);
        let metrics = fixed_aggregator().aggregate(&enriched);

        prop_assert_eq!(statement.net_income, metrics.net_income);
        prop_assert_eq!(
            statement.gross_profit - statement.expenses.value + statement.non_operating.value,
            metrics.total_credit - metrics.total_debit
        );
    }

    #[test]
    fn prop_undated_records_are_counted(records in prop::collection::vec(arb_record(), 0..40)) {
        let enriched = enrich(&records);
        let metrics = fixed_aggregator().aggregate(&enriched);
        let undated = records.iter().filter(|r| r.date.is_none()).count();

        prop_assert_eq!(metrics.date_fallbacks, undated);
    }
}
