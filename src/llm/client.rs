use crate::error::{ReportError, Result};
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Thin client for the commentary service. Deterministic settings
/// (temperature 0) so reruns over the same tables read the same way.
#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: ANTHROPIC_BASE_URL.to_string(),
            model: model.into(),
        }
    }

    /// Sends one prompt and returns the model's text. Throttling surfaces
    /// as [`ReportError::RateLimited`] so the retry layer can back off.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let payload = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "temperature": 0,
            "messages": [{ "role": "user", "content": prompt }],
        });

        debug!("Requesting commentary from model {}", self.model);

        let res = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await?;

        let status = res.status();
        if status.as_u16() == 429 || status.as_u16() == 529 {
            let retry_after_secs = res
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(30);
            return Err(ReportError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let message = res.text().await.unwrap_or_default();
            return Err(ReportError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: MessagesResponse = res.json().await?;
        let text = body
            .content
            .iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text.trim().to_string())
            .ok_or_else(|| {
                ReportError::Commentary("Model returned no text content".to_string())
            })?;

        if text.is_empty() {
            return Err(ReportError::Commentary("Model returned empty text".to_string()));
        }

        Ok(text)
    }
}
