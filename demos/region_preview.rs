use ledger_analytics::{Classifier, LedgerRecord, RegionRuleSet, Result, DEFAULT_PREVIEW_ROWS};

fn department(code: &str, name: &str) -> LedgerRecord {
    LedgerRecord {
        department_code: code.to_string(),
        department_name: name.to_string(),
        ..Default::default()
    }
}

fn show(rules: &RegionRuleSet, records: &[LedgerRecord]) -> Result<()> {
    let classifier = Classifier::new(rules)?;
    for row in classifier.preview(records, DEFAULT_PREVIEW_ROWS) {
        println!(
            "  {:<14} {:<10} -> {}",
            row.department_code, row.department_name, row.region
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let records = vec![
        department("A004-000", "總管理處"),
        department("A004-002-01", "台北營業處"),
        department("B004-001-07", "台南加盟店"),
        department("K004-006-3", "高雄營業處"),
        department("P004-004-1", "馬公加盟店"),
        department("X999", "社福本部"),
    ];

    let mut rules = RegionRuleSet::default_rules();
    println!("Default rules:");
    println!("{}", serde_json::to_string(&rules)?);
    show(&rules, &records)?;

    // Regions are checked in order, so a broad catch-all added later never
    // shadows the presets above it.
    rules.add_pattern("離島", "P*");
    rules.add_pattern("其他據點", "*");
    println!("\nWith extra patterns:");
    show(&rules, &records)?;

    rules.remove_pattern("其他據點", "*");
    println!("\nAfter removing the catch-all ({} regions):", rules.len());
    show(&rules, &records)?;

    Ok(())
}
