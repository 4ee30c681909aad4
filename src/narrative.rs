//! Inputs and guards for the AI narrative layer: the analyst prompt built from
//! a [`MetricsSummary`], parsing of the model's insight list, a sliding-window
//! rate limiter with an injectable clock, and a gate that marks superseded
//! responses as stale.
//!
//! Nothing here performs I/O; the HTTP client lives in `llm` behind the
//! `gemini` feature.

use crate::aggregator::MetricsSummary;
use crate::error::{LedgerAnalyticsError, Result};
use crate::utils::format_number;
use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

pub const DEFAULT_MAX_REQUESTS: usize = 10;
pub const DEFAULT_WINDOW_SECS: i64 = 60;

pub const INSIGHTS_INSTRUCTION: &str = "\
Based on the provided financial data, please generate 3-5 key insights.
Focus on:
1. Overall financial health
2. Significant trends (revenue or expense changes)
3. Areas of concern (high expenses or low margins)
4. Top performing areas

**IMPORTANT: The output must be a JSON array of strings in Traditional Chinese (繁體中文).**
Example: [\"本月營收成長 10%\", \"支出主要集中在人事成本\"]

Format the output as a JSON array of strings.
Do not include markdown formatting like ```json. Just return the raw JSON string.";

/// Analyst context describing the dashboard figures.
pub fn build_system_prompt(summary: &MetricsSummary) -> String {
    let join_ranked = |items: Vec<String>| items.join(", ");

    let top_revenue = join_ranked(
        summary
            .top_revenue_accounts
            .iter()
            .map(|a| format!("{} ({})", a.name, format_number(a.value)))
            .collect(),
    );
    let top_expense = join_ranked(
        summary
            .top_expense_accounts
            .iter()
            .map(|a| format!("{} ({})", a.name, format_number(a.value)))
            .collect(),
    );
    let top_departments = join_ranked(
        summary
            .top_profit_departments
            .iter()
            .map(|d| format!("{} ({})", d.name, format_number(d.net)))
            .collect(),
    );
    let monthly = summary
        .monthly
        .iter()
        .map(|m| {
            format!(
                "{}: Rev {}, Exp {}, Net {}",
                m.name,
                format_number(m.credit),
                format_number(m.debit),
                format_number(m.net)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let regions = join_ranked(
        summary
            .regions
            .iter()
            .map(|r| format!("{}: Net {}", r.name, format_number(r.net)))
            .collect(),
    );
    let store_types = join_ranked(
        summary
            .store_type_shares
            .iter()
            .map(|s| {
                format!(
                    "{}: Net {}",
                    s.store_type.local_label(),
                    format_number(s.real_value)
                )
            })
            .collect(),
    );

    format!(
        "You are a financial analyst assistant. You are analyzing Profit & Loss (P&L) data.
Here is the summary of the financial data:
Total Revenue (Credit): {}
Total Expenses (Debit): {}
Net Income: {}
Profit Margin: {:.2}%

Top Revenue Accounts: {}
Top Expense Accounts: {}
Top Profit Departments: {}

Monthly Trend:
{}

Region Performance:
{}

Store Type Performance:
{}

Please provide concise, professional, and actionable insights based on this data.
**IMPORTANT: You must answer in Traditional Chinese (繁體中文).**
When answering questions, be specific and use the provided numbers.
If the user asks about something not in the data, politely say you don't have that information.
",
        format_number(summary.total_credit),
        format_number(summary.total_debit),
        format_number(summary.net_income),
        summary.profit_margin,
        top_revenue,
        top_expense,
        top_departments,
        monthly,
        regions,
        store_types
    )
}

/// The short insight strings the model is asked to return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct InsightList(pub Vec<String>);

impl InsightList {
    pub fn response_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(InsightList)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Accepts a JSON string array, optionally wrapped in a ```json fence. Any
/// other reply is split into its non-empty lines.
pub fn parse_insights(text: &str) -> InsightList {
    let cleaned = text.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();

    match serde_json::from_str::<Vec<String>>(cleaned) {
        Ok(items) => InsightList(items),
        Err(_) => InsightList(
            cleaned
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        ),
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Allows at most `max_requests` acquisitions in any trailing `window`.
#[derive(Debug)]
pub struct RateLimiter<C: Clock = SystemClock> {
    clock: C,
    max_requests: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<DateTime<Utc>>>,
}

impl RateLimiter<SystemClock> {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self::with_clock(SystemClock, max_requests, window)
    }
}

impl Default for RateLimiter<SystemClock> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, Duration::seconds(DEFAULT_WINDOW_SECS))
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(clock: C, max_requests: usize, window: Duration) -> Self {
        Self {
            clock,
            max_requests,
            window,
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Records a request if the window has room.
    pub fn try_acquire(&self) -> Result<()> {
        let now = self.clock.now();
        let mut timestamps = self.timestamps.lock().unwrap_or_else(|e| e.into_inner());
        self.evict_expired(&mut timestamps, now);

        if timestamps.len() >= self.max_requests {
            let retry_after = match timestamps.front() {
                Some(oldest) => self.window - (now - *oldest),
                None => self.window,
            };
            let millis = retry_after.num_milliseconds().max(0);
            return Err(LedgerAnalyticsError::RateLimited {
                retry_after_secs: ((millis + 999) / 1000) as u64,
            });
        }

        timestamps.push_back(now);
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        let now = self.clock.now();
        let mut timestamps = self.timestamps.lock().unwrap_or_else(|e| e.into_inner());
        self.evict_expired(&mut timestamps, now);
        self.max_requests.saturating_sub(timestamps.len())
    }

    fn evict_expired(&self, timestamps: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>) {
        while let Some(oldest) = timestamps.front() {
            if now - *oldest >= self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Identifies one user action; only the most recent ticket is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket(u64);

#[derive(Debug, Default)]
pub struct RequestGate {
    generation: AtomicU64,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new request, superseding every earlier ticket.
    pub fn begin(&self) -> RequestTicket {
        RequestTicket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }

    pub fn ensure_current(&self, ticket: RequestTicket) -> Result<()> {
        if self.is_current(ticket) {
            Ok(())
        } else {
            Err(LedgerAnalyticsError::StaleResponse)
        }
    }
}
