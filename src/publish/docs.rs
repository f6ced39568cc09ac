use crate::error::{ReportError, Result};
use crate::markup::{render_markdown, Document};
use crate::retry::{with_retry, RetryPolicy};
use base64::Engine;
use log::info;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// One image embedded in an archived document, base64-encoded so the
/// whole document travels as a single JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedImage {
    pub name: String,
    pub content_type: String,
    pub data: String,
}

impl EmbeddedImage {
    #[must_use]
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

#[derive(Debug, Serialize)]
struct DocumentPayload<'a> {
    title: &'a str,
    body_markdown: String,
    images: &'a [EmbeddedImage],
}

/// Archives the full report to the document store. The store's response
/// content is ignored beyond success/failure.
pub struct DocumentStorePublisher {
    client: Client,
    endpoint: String,
    api_key: String,
    policy: RetryPolicy,
}

impl DocumentStorePublisher {
    pub fn new(endpoint: String, api_key: String, policy: RetryPolicy) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            api_key,
            policy,
        }
    }

    /// Charts referenced by the body must already be in `images`; the
    /// store resolves references by image name.
    pub async fn publish(
        &self,
        title: &str,
        document: &Document,
        images: &[EmbeddedImage],
    ) -> Result<()> {
        let payload = DocumentPayload {
            title,
            body_markdown: render_markdown(document),
            images,
        };

        with_retry(&self.policy, "document store publish", || {
            self.publish_once(&payload)
        })
        .await
    }

    async fn publish_once(&self, payload: &DocumentPayload<'_>) -> Result<()> {
        let res = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await?;

        let status = res.status();
        if status.as_u16() == 429 {
            return Err(ReportError::RateLimited { retry_after_secs: 30 });
        }
        if !status.is_success() {
            let details = res.text().await.unwrap_or_default();
            return Err(ReportError::Publishing {
                target: "document store".to_string(),
                details: format!("status {}: {}", status, details),
            });
        }

        info!("Archived document '{}'", payload.title);
        Ok(())
    }
}
