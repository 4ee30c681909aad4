use crate::error::{LedgerAnalyticsError, Result};
use crate::llm::types::*;
use log::debug;
use reqwest::Client;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) async fn generate_content(
        &self,
        system_prompt: &str,
        messages: Vec<Content>,
        response_schema: Option<serde_json::Value>,
    ) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let generation_config = match response_schema {
            Some(schema) => GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(schema),
            },
            None => GenerationConfig::default(),
        };

        let payload = GenerateContentRequest {
            contents: messages,
            system_instruction: Some(Content::user(system_prompt)),
            generation_config,
        };

        debug!(
            "Sending {} message(s) to {}",
            payload.contents.len(),
            self.model
        );
        let res = self.client.post(&url).json(&payload).send().await?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await?;
            return Err(LedgerAnalyticsError::NarrativeFailed(format!(
                "Gemini API Error (status {}): {}",
                status, err_text
            )));
        }

        let body: GenerateContentResponse = res.json().await?;
        extract_text(body)
    }
}

fn extract_text(body: GenerateContentResponse) -> Result<String> {
    let part = body
        .candidates
        .ok_or_else(|| LedgerAnalyticsError::NarrativeFailed("No candidates returned".to_string()))?
        .into_iter()
        .next()
        .ok_or_else(|| LedgerAnalyticsError::NarrativeFailed("Empty candidates list".to_string()))?
        .content
        .parts
        .into_iter()
        .next()
        .ok_or_else(|| LedgerAnalyticsError::NarrativeFailed("No parts in content".to_string()))?;

    match part {
        Part::Text { text } => Ok(text),
        Part::Other(_) => Err(LedgerAnalyticsError::NarrativeFailed(
            "Model returned non-text content".to_string(),
        )),
    }
}
