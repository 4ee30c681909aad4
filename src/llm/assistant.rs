use std::sync::Mutex;

use log::{info, warn};

use crate::aggregator::MetricsSummary;
use crate::error::Result;
use crate::llm::client::GeminiClient;
use crate::llm::types::Content;
use crate::narrative::{
    build_system_prompt, parse_insights, InsightList, RateLimiter, RequestGate,
    INSIGHTS_INSTRUCTION,
};

/// Dashboard insights and follow-up questions, rate limited and guarded
/// against responses that arrive after a newer request was made.
pub struct NarrativeAssistant {
    client: GeminiClient,
    limiter: RateLimiter,
    insights_gate: RequestGate,
    chat_gate: RequestGate,
    history: Mutex<Vec<Content>>,
}

impl NarrativeAssistant {
    pub fn new(client: GeminiClient) -> Self {
        Self::with_limiter(client, RateLimiter::default())
    }

    pub fn with_limiter(client: GeminiClient, limiter: RateLimiter) -> Self {
        Self {
            client,
            limiter,
            insights_gate: RequestGate::new(),
            chat_gate: RequestGate::new(),
            history: Mutex::new(Vec::new()),
        }
    }

    /// 3-5 short observations about the given metrics.
    pub async fn generate_insights(&self, summary: &MetricsSummary) -> Result<InsightList> {
        self.limiter.try_acquire()?;
        let ticket = self.insights_gate.begin();

        let schema = serde_json::json!({ "type": "ARRAY", "items": { "type": "STRING" } });
        let text = self
            .client
            .generate_content(
                &build_system_prompt(summary),
                vec![Content::user(INSIGHTS_INSTRUCTION)],
                Some(schema),
            )
            .await?;

        if let Err(e) = self.insights_gate.ensure_current(ticket) {
            warn!("Discarding insights for a superseded request");
            return Err(e);
        }

        let insights = parse_insights(&text);
        info!("Generated {} insight(s)", insights.len());
        Ok(insights)
    }

    /// Answers a question in the context of the metrics and prior turns.
    pub async fn ask_question(&self, summary: &MetricsSummary, question: &str) -> Result<String> {
        self.limiter.try_acquire()?;
        let ticket = self.chat_gate.begin();

        let mut messages = self.history_snapshot();
        messages.push(Content::user(question));

        let answer = self
            .client
            .generate_content(&build_system_prompt(summary), messages, None)
            .await?;

        if let Err(e) = self.chat_gate.ensure_current(ticket) {
            warn!("Discarding answer for a superseded question");
            return Err(e);
        }

        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        history.push(Content::user(question));
        history.push(Content::model(answer.clone()));
        Ok(answer)
    }

    pub fn clear_history(&self) {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn history_len(&self) -> usize {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn history_snapshot(&self) -> Vec<Content> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
