use crate::aggregator::UNKNOWN_LABEL;
use crate::schema::{EnrichedRecord, LedgerRecord};
use crate::utils::format_number;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Revenue,
    Costs,
    Expenses,
    NonOperating,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Revenue,
        SectionKind::Costs,
        SectionKind::Expenses,
        SectionKind::NonOperating,
    ];

    /// Section selected by the leading digit of an account code.
    pub fn from_account_code(code: &str) -> Option<Self> {
        match code.chars().next()? {
            '4' => Some(SectionKind::Revenue),
            '5' => Some(SectionKind::Costs),
            '6' => Some(SectionKind::Expenses),
            '7' => Some(SectionKind::NonOperating),
            _ => None,
        }
    }

    pub fn prefix(&self) -> char {
        match self {
            SectionKind::Revenue => '4',
            SectionKind::Costs => '5',
            SectionKind::Expenses => '6',
            SectionKind::NonOperating => '7',
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::Revenue => "營業收入",
            SectionKind::Costs => "營業成本",
            SectionKind::Expenses => "營業費用",
            SectionKind::NonOperating => "營業外收支",
        }
    }

    pub fn english_title(&self) -> &'static str {
        match self {
            SectionKind::Revenue => "Revenue",
            SectionKind::Costs => "Costs",
            SectionKind::Expenses => "Expenses",
            SectionKind::NonOperating => "Non-Operating",
        }
    }

    /// Credit-balance sections count credit minus debit, debit-balance
    /// sections the reverse.
    pub fn signed_amount(&self, debit: f64, credit: f64) -> f64 {
        match self {
            SectionKind::Revenue | SectionKind::NonOperating => credit - debit,
            SectionKind::Costs | SectionKind::Expenses => debit - credit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    pub account_code: String,
    pub account_name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementSection {
    pub kind: SectionKind,
    pub title: String,
    pub code: String,
    pub value: f64,
    /// Sorted by account code.
    pub items: Vec<StatementLine>,
}

impl StatementSection {
    fn empty(kind: SectionKind) -> Self {
        Self {
            kind,
            title: kind.title().to_string(),
            code: kind.prefix().to_string(),
            value: 0.0,
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlStatement {
    pub revenue: StatementSection,
    pub costs: StatementSection,
    pub expenses: StatementSection,
    pub non_operating: StatementSection,
    pub gross_profit: f64,
    pub operating_income: f64,
    pub net_income: f64,
}

pub struct StatementBuilder;

impl StatementBuilder {
    pub fn build(records: &[EnrichedRecord]) -> PlStatement {
        Self::build_from_records(records.iter().map(|r| &r.record))
    }

    /// Records whose account code does not start with 4-7 are left out.
    pub fn build_from_records<'a>(records: impl IntoIterator<Item = &'a LedgerRecord>) -> PlStatement {
        // Keyed by exact account code; BTreeMap keeps the codes sorted.
        let mut lines: BTreeMap<String, (SectionKind, StatementLine)> = BTreeMap::new();
        let mut skipped = 0usize;

        for record in records {
            let Some(kind) = SectionKind::from_account_code(&record.account_code) else {
                skipped += 1;
                continue;
            };

            let amount = kind.signed_amount(record.debit, record.credit);
            lines
                .entry(record.account_code.clone())
                .or_insert_with(|| {
                    let name = if record.account_name.is_empty() {
                        UNKNOWN_LABEL.to_string()
                    } else {
                        record.account_name.clone()
                    };
                    (
                        kind,
                        StatementLine {
                            account_code: record.account_code.clone(),
                            account_name: name,
                            value: 0.0,
                        },
                    )
                })
                .1
                .value += amount;
        }

        let mut revenue = StatementSection::empty(SectionKind::Revenue);
        let mut costs = StatementSection::empty(SectionKind::Costs);
        let mut expenses = StatementSection::empty(SectionKind::Expenses);
        let mut non_operating = StatementSection::empty(SectionKind::NonOperating);

        for (kind, line) in lines.into_values() {
            let section = match kind {
                SectionKind::Revenue => &mut revenue,
                SectionKind::Costs => &mut costs,
                SectionKind::Expenses => &mut expenses,
                SectionKind::NonOperating => &mut non_operating,
            };
            section.value += line.value;
            section.items.push(line);
        }

        let gross_profit = revenue.value - costs.value;
        let operating_income = gross_profit - expenses.value;
        let net_income = operating_income + non_operating.value;

        debug!(
            "Built P&L statement: {} revenue, {} cost, {} expense, {} non-operating lines ({} records outside 4-7)",
            revenue.items.len(),
            costs.items.len(),
            expenses.items.len(),
            non_operating.items.len(),
            skipped
        );

        PlStatement {
            revenue,
            costs,
            expenses,
            non_operating,
            gross_profit,
            operating_income,
            net_income,
        }
    }
}

pub fn build_statement(records: &[EnrichedRecord]) -> PlStatement {
    StatementBuilder::build(records)
}

impl PlStatement {
    pub fn section(&self, kind: SectionKind) -> &StatementSection {
        match kind {
            SectionKind::Revenue => &self.revenue,
            SectionKind::Costs => &self.costs,
            SectionKind::Expenses => &self.expenses,
            SectionKind::NonOperating => &self.non_operating,
        }
    }

    pub fn sections(&self) -> [&StatementSection; 4] {
        [
            &self.revenue,
            &self.costs,
            &self.expenses,
            &self.non_operating,
        ]
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str("Section,Account Code,Account Name,Value\n");

        for section in self.sections() {
            for line in &section.items {
                output.push_str(&format!(
                    "{},{},{},{:.2}\n",
                    section.kind.english_title(),
                    csv_field(&line.account_code),
                    csv_field(&line.account_name),
                    line.value
                ));
            }
            output.push_str(&format!(
                "{} Total,,,{:.2}\n",
                section.kind.english_title(),
                section.value
            ));
        }

        output.push_str(&format!("Gross Profit,,,{:.2}\n", self.gross_profit));
        output.push_str(&format!("Operating Income,,,{:.2}\n", self.operating_income));
        output.push_str(&format!("Net Income,,,{:.2}\n", self.net_income));

        output
    }

    /// Statement laid out top to bottom with the subtotal rows after costs,
    /// after expenses and at the end.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str("# 損益表\n\n");
        output.push_str("_Profit & Loss Statement_\n\n");

        self.push_section_markdown(&mut output, &self.revenue);
        self.push_section_markdown(&mut output, &self.costs);
        push_subtotal_markdown(&mut output, "營業毛利", "Gross Profit", self.gross_profit);
        self.push_section_markdown(&mut output, &self.expenses);
        push_subtotal_markdown(&mut output, "營業利益", "Operating Income", self.operating_income);
        self.push_section_markdown(&mut output, &self.non_operating);
        push_subtotal_markdown(&mut output, "本期淨利", "Net Income", self.net_income);

        output
    }

    fn push_section_markdown(&self, output: &mut String, section: &StatementSection) {
        output.push_str(&format!(
            "## {} ({}): {}\n\n",
            section.title,
            section.kind.english_title(),
            format_number(section.value)
        ));

        if section.items.is_empty() {
            output.push_str("_No accounts_\n\n");
            return;
        }

        output.push_str("| Code | Account | Amount |\n");
        output.push_str("|------|---------|-------:|\n");
        for line in &section.items {
            output.push_str(&format!(
                "| {} | {} | {} |\n",
                line.account_code,
                line.account_name,
                format_number(line.value)
            ));
        }
        output.push('\n');
    }
}

fn push_subtotal_markdown(output: &mut String, title: &str, english: &str, value: f64) {
    let marker = if value > 0.0 {
        "▲"
    } else if value < 0.0 {
        "▼"
    } else {
        "–"
    };
    output.push_str(&format!(
        "**{} ({})**: {} {}\n\n",
        title,
        english,
        marker,
        format_number(value)
    ));
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StoreType;

    fn row(code: &str, name: &str, debit: f64, credit: f64) -> EnrichedRecord {
        EnrichedRecord {
            record: LedgerRecord {
                account_code: code.to_string(),
                account_name: name.to_string(),
                debit,
                credit,
                ..Default::default()
            },
            region: "Other".to_string(),
            store_type: StoreType::Franchise,
        }
    }

    #[test]
    fn test_revenue_and_costs_scenario() {
        let statement = build_statement(&[
            row("4001", "Sales", 0.0, 1000.0),
            row("5001", "COGS", 400.0, 0.0),
        ]);

        assert_eq!(statement.revenue.value, 1000.0);
        assert_eq!(statement.costs.value, 400.0);
        assert_eq!(statement.gross_profit, 600.0);
        assert_eq!(statement.operating_income, 600.0);
        assert_eq!(statement.net_income, 600.0);
        assert!(statement.expenses.items.is_empty());
        assert!(statement.non_operating.items.is_empty());
    }

    #[test]
    fn test_sign_conventions_and_rollups() {
        let statement = build_statement(&[
            row("4001", "Sales", 50.0, 1000.0),
            row("5001", "COGS", 400.0, 20.0),
            row("6101", "Salaries", 200.0, 0.0),
            row("7001", "Interest income", 0.0, 30.0),
            row("7101", "Interest expense", 80.0, 0.0),
        ]);

        assert_eq!(statement.revenue.value, 950.0);
        assert_eq!(statement.costs.value, 380.0);
        assert_eq!(statement.expenses.value, 200.0);
        assert_eq!(statement.non_operating.value, -50.0);
        assert_eq!(statement.gross_profit, 570.0);
        assert_eq!(statement.operating_income, 370.0);
        assert_eq!(statement.net_income, 320.0);
    }

    #[test]
    fn test_lines_grouped_by_code_and_sorted() {
        let statement = build_statement(&[
            row("4102", "Service income", 0.0, 10.0),
            row("4001", "Sales", 0.0, 5.0),
            row("4102", "Service income (renamed)", 0.0, 7.0),
            row("40011", "Sales sub-account", 0.0, 1.0),
        ]);

        let codes: Vec<&str> = statement
            .revenue
            .items
            .iter()
            .map(|l| l.account_code.as_str())
            .collect();
        assert_eq!(codes, vec!["4001", "40011", "4102"]);

        let service = &statement.revenue.items[2];
        assert_eq!(service.value, 17.0);
        assert_eq!(service.account_name, "Service income");
    }

    #[test]
    fn test_unrecognized_prefixes_are_excluded() {
        let statement = build_statement(&[
            row("1101", "Cash", 0.0, 999.0),
            row("", "Blank", 0.0, 999.0),
            row("8001", "Tax", 100.0, 0.0),
            row("4001", "Sales", 0.0, 10.0),
        ]);

        let total_lines: usize = statement.sections().iter().map(|s| s.items.len()).sum();
        assert_eq!(total_lines, 1);
        assert_eq!(statement.net_income, 10.0);
    }

    #[test]
    fn test_section_metadata() {
        let statement = build_statement(&[]);
        assert_eq!(statement.revenue.title, "營業收入");
        assert_eq!(statement.costs.code, "5");
        assert_eq!(statement.section(SectionKind::NonOperating).title, "營業外收支");
        assert_eq!(statement.net_income, 0.0);
    }

    #[test]
    fn test_markdown_rendering() {
        let statement = build_statement(&[
            row("4001", "Sales", 0.0, 1500.0),
            row("5001", "COGS", 400.0, 0.0),
        ]);
        let markdown = statement.to_markdown();

        assert!(markdown.contains("# 損益表"));
        assert!(markdown.contains("## 營業收入 (Revenue): 1,500"));
        assert!(markdown.contains("| 4001 | Sales | 1,500 |"));
        assert!(markdown.contains("**營業毛利 (Gross Profit)**: ▲ 1,100"));
        assert!(markdown.contains("_No accounts_"));
    }

    #[test]
    fn test_csv_rendering() {
        let statement = build_statement(&[row("6001", "Rent, office", 120.0, 0.0)]);
        let csv = statement.to_csv();

        assert!(csv.starts_with("Section,Account Code,Account Name,Value\n"));
        assert!(csv.contains("Expenses,6001,\"Rent, office\",120.00"));
        assert!(csv.contains("Net Income,,,-120.00"));
    }
}
