//! Folds enriched ledger records into the dashboard metrics: monthly trend,
//! account and department rankings, region and store-type breakdowns, and the
//! headline totals.
//!
//! Every ranking uses a stable sort, so groups with equal values keep the
//! order in which they first appeared in the input.

use crate::schema::{EnrichedRecord, LedgerRecord, StoreType};
use crate::utils::month_label;
use chrono::{Datelike, Local, NaiveDate};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Length of every top-N ranking.
pub const TOP_N: usize = 5;

/// Label for records whose account or department name is blank.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub debit: f64,
    pub credit: f64,
    pub net: f64,
}

impl Totals {
    fn add(&mut self, record: &LedgerRecord) {
        self.debit += record.debit;
        self.credit += record.credit;
        self.net += record.net();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    /// Short month and two-digit year, e.g. `Mar 24`.
    pub name: String,
    pub year: i32,
    pub month: u32,
    pub debit: f64,
    pub credit: f64,
    pub net: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedValue {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub name: String,
    pub debit: f64,
    pub credit: f64,
    pub net: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginSummary {
    pub name: String,
    pub debit: f64,
    pub credit: f64,
    pub net: f64,
    /// Net as a percentage of credit.
    pub margin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreTypeShare {
    pub name: String,
    pub store_type: StoreType,
    /// Magnitude of net income, for proportional charts.
    pub value: f64,
    /// Signed net income.
    pub real_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_debit: f64,
    pub total_credit: f64,
    pub net_income: f64,
    pub profit_margin: f64,
    pub record_count: usize,
    /// Records whose date was missing or unparsable and were bucketed under
    /// the fallback date.
    pub date_fallbacks: usize,
    pub monthly: Vec<MonthlyPoint>,
    pub top_revenue_accounts: Vec<RankedValue>,
    pub top_expense_accounts: Vec<RankedValue>,
    pub top_profit_departments: Vec<GroupSummary>,
    pub top_margin_departments: Vec<MarginSummary>,
    pub regions: Vec<GroupSummary>,
    pub store_type_shares: Vec<StoreTypeShare>,
}

/// Groups keyed by name or store type, remembering first-appearance order.
#[derive(Debug)]
struct Grouped<K, V> {
    index: HashMap<K, usize>,
    groups: Vec<(K, V)>,
}

impl<K, V> Default for Grouped<K, V> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }
}

impl<K: Hash + Eq + Clone, V> Grouped<K, V> {
    fn entry_with<Q>(&mut self, key: &Q, init: impl FnOnce() -> V) -> &mut V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        let position = match self.index.get(key).copied() {
            Some(position) => position,
            None => {
                let owned = key.to_owned();
                self.groups.push((owned.clone(), init()));
                self.index.insert(owned, self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        &mut self.groups[position].1
    }

    fn into_groups(self) -> Vec<(K, V)> {
        self.groups
    }
}

impl<K: Hash + Eq + Clone> Grouped<K, Totals> {
    fn entry<Q>(&mut self, key: &Q) -> &mut Totals
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        self.entry_with(key, Totals::default)
    }
}

impl Grouped<String, Totals> {
    fn into_summaries(self) -> Vec<GroupSummary> {
        self.groups
            .into_iter()
            .map(|(name, totals)| GroupSummary {
                name,
                debit: totals.debit,
                credit: totals.credit,
                net: totals.net,
            })
            .collect()
    }
}

/// Per-account totals; the code of the first record seen decides the prefix.
struct AccountBucket {
    code: String,
    totals: Totals,
}

pub struct Aggregator {
    fallback_date: NaiveDate,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    /// Undated records fall into today's month.
    pub fn new() -> Self {
        Self {
            fallback_date: Local::now().date_naive(),
        }
    }

    pub fn with_fallback_date(fallback_date: NaiveDate) -> Self {
        Self { fallback_date }
    }

    pub fn fallback_date(&self) -> NaiveDate {
        self.fallback_date
    }

    pub fn aggregate(&self, records: &[EnrichedRecord]) -> MetricsSummary {
        let mut total_debit = 0.0;
        let mut total_credit = 0.0;
        let mut date_fallbacks = 0;

        let mut months: BTreeMap<(i32, u32), Totals> = BTreeMap::new();
        let mut accounts: Grouped<String, AccountBucket> = Grouped::default();
        let mut departments: Grouped<String, Totals> = Grouped::default();
        let mut regions: Grouped<String, Totals> = Grouped::default();
        let mut store_types: Grouped<StoreType, Totals> = Grouped::default();

        for (row, enriched) in records.iter().enumerate() {
            let record = &enriched.record;
            total_debit += record.debit;
            total_credit += record.credit;

            let date = match record.date {
                Some(date) => date,
                None => {
                    date_fallbacks += 1;
                    warn!(
                        "Row {} has no usable date; counting it in {}",
                        row,
                        month_label(self.fallback_date)
                    );
                    self.fallback_date
                }
            };
            months
                .entry((date.year(), date.month()))
                .or_default()
                .add(record);

            accounts
                .entry_with(label_or_unknown(&record.account_name), || AccountBucket {
                    code: record.account_code.clone(),
                    totals: Totals::default(),
                })
                .totals
                .add(record);

            departments
                .entry(label_or_unknown(&record.department_name))
                .add(record);
            regions
                .entry(label_or_unknown(&enriched.region))
                .add(record);
            store_types.entry(&enriched.store_type).add(record);
        }

        let monthly = months
            .into_iter()
            .filter_map(|((year, month), totals)| {
                let first_day = NaiveDate::from_ymd_opt(year, month, 1)?;
                Some(MonthlyPoint {
                    name: month_label(first_day),
                    year,
                    month,
                    debit: totals.debit,
                    credit: totals.credit,
                    net: totals.net,
                })
            })
            .collect();

        let account_rows = accounts.into_groups();

        let top_revenue_accounts = top_accounts(&account_rows, &['4'], |t| t.credit);
        let top_expense_accounts = top_accounts(&account_rows, &['5', '6'], |t| t.debit);

        let departments = departments.into_summaries();

        let mut top_profit_departments = departments.clone();
        top_profit_departments.sort_by(|a, b| descending(a.net, b.net));
        top_profit_departments.truncate(TOP_N);

        let mut top_margin_departments: Vec<MarginSummary> = departments
            .into_iter()
            .filter(|d| d.credit > 0.0)
            .map(|d| MarginSummary {
                margin: d.net / d.credit * 100.0,
                name: d.name,
                debit: d.debit,
                credit: d.credit,
                net: d.net,
            })
            .collect();
        top_margin_departments.sort_by(|a, b| descending(a.margin, b.margin));
        top_margin_departments.truncate(TOP_N);

        let mut regions = regions.into_summaries();
        regions.sort_by(|a, b| descending(a.net, b.net));

        let store_type_shares = store_types
            .into_groups()
            .into_iter()
            .map(|(store_type, totals)| StoreTypeShare {
                name: store_type.label().to_string(),
                store_type,
                value: totals.net.abs(),
                real_value: totals.net,
            })
            .filter(|share| share.value != 0.0)
            .collect();

        let net_income = total_credit - total_debit;
        let profit_margin = if total_credit > 0.0 {
            net_income / total_credit * 100.0
        } else {
            0.0
        };

        info!(
            "Aggregated {} records: credit {:.2}, debit {:.2}, net {:.2}",
            records.len(),
            total_credit,
            total_debit,
            net_income
        );
        if date_fallbacks > 0 {
            warn!(
                "{} of {} records used the fallback date {}",
                date_fallbacks,
                records.len(),
                self.fallback_date
            );
        }
        debug!("Region breakdown: {:?}", regions);

        MetricsSummary {
            total_debit,
            total_credit,
            net_income,
            profit_margin,
            record_count: records.len(),
            date_fallbacks,
            monthly,
            top_revenue_accounts,
            top_expense_accounts,
            top_profit_departments,
            top_margin_departments,
            regions,
            store_type_shares,
        }
    }
}

/// Aggregates with undated records counted in the current month.
pub fn aggregate(records: &[EnrichedRecord]) -> MetricsSummary {
    Aggregator::new().aggregate(records)
}

fn label_or_unknown(name: &str) -> &str {
    if name.is_empty() {
        UNKNOWN_LABEL
    } else {
        name
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

fn top_accounts(
    accounts: &[(String, AccountBucket)],
    prefixes: &[char],
    metric: impl Fn(&Totals) -> f64,
) -> Vec<RankedValue> {
    let mut ranked: Vec<RankedValue> = accounts
        .iter()
        .filter(|(_, bucket)| {
            bucket
                .code
                .chars()
                .next()
                .is_some_and(|c| prefixes.contains(&c))
        })
        .map(|(name, bucket)| RankedValue {
            name: name.clone(),
            value: metric(&bucket.totals),
        })
        .collect();

    ranked.sort_by(|a, b| descending(a.value, b.value));
    ranked.truncate(TOP_N);
    ranked
}
