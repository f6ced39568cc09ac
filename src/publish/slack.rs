use crate::error::{ReportError, Result};
use crate::markup::{render_slack, Document};
use crate::retry::{with_retry, RetryPolicy};
use log::info;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tokio::fs;

const SLACK_BASE_URL: &str = "https://slack.com/api";

#[derive(Debug, Deserialize)]
struct SlackEnvelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    upload_url: Option<String>,
    #[serde(default)]
    file_id: Option<String>,
}

fn slack_error(action: &str, envelope: &SlackEnvelope) -> ReportError {
    ReportError::Publishing {
        target: "Slack".to_string(),
        details: format!(
            "{} returned error: {}",
            action,
            envelope.error.as_deref().unwrap_or("unknown")
        ),
    }
}

/// Posts report sections and chart images to one Slack channel.
pub struct SlackPublisher {
    client: Client,
    token: String,
    channel_id: String,
    base_url: String,
    policy: RetryPolicy,
}

impl SlackPublisher {
    pub fn new(token: String, channel_id: String, policy: RetryPolicy) -> Self {
        Self {
            client: Client::new(),
            token,
            channel_id,
            base_url: SLACK_BASE_URL.to_string(),
            policy,
        }
    }

    /// Renders the document as mrkdwn and posts it. Returns the message
    /// timestamp Slack assigns.
    pub async fn post_document(&self, document: &Document) -> Result<String> {
        self.post_text(&render_slack(document)).await
    }

    pub async fn post_text(&self, text: &str) -> Result<String> {
        with_retry(&self.policy, "Slack chat.postMessage", || {
            self.post_once(text)
        })
        .await
    }

    async fn post_once(&self, text: &str) -> Result<String> {
        let res = self
            .client
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({ "channel": self.channel_id, "text": text }))
            .send()
            .await?;

        if res.status().as_u16() == 429 {
            let retry_after_secs = res
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(30);
            return Err(ReportError::RateLimited { retry_after_secs });
        }

        let envelope: SlackEnvelope = res.json().await?;
        if !envelope.ok {
            return Err(slack_error("chat.postMessage", &envelope));
        }
        let ts = envelope.ts.unwrap_or_default();
        info!("Posted Slack message {} to {}", ts, self.channel_id);
        Ok(ts)
    }

    /// Uploads a chart image to the channel via Slack's external upload
    /// flow: reserve an upload URL, send the bytes, then finalize.
    pub async fn upload_chart(&self, path: &Path, title: &str) -> Result<()> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ReportError::Publishing {
                target: "Slack".to_string(),
                details: format!("Invalid chart file name: {}", path.display()),
            })?;
        let bytes = fs::read(path).await?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();

        let length = bytes.len().to_string();
        let reserve: SlackEnvelope = self
            .client
            .get(format!("{}/files.getUploadURLExternal", self.base_url))
            .bearer_auth(&self.token)
            .query(&[("filename", file_name), ("length", length.as_str())])
            .send()
            .await?
            .json()
            .await?;
        if !reserve.ok {
            return Err(slack_error("files.getUploadURLExternal", &reserve));
        }
        let upload_url = reserve.upload_url.ok_or_else(|| ReportError::Publishing {
            target: "Slack".to_string(),
            details: "Upload reservation missing upload_url".to_string(),
        })?;
        let file_id = reserve.file_id.ok_or_else(|| ReportError::Publishing {
            target: "Slack".to_string(),
            details: "Upload reservation missing file_id".to_string(),
        })?;

        let upload_res = self
            .client
            .post(&upload_url)
            .header("Content-Type", mime_type)
            .body(bytes)
            .send()
            .await?;
        if !upload_res.status().is_success() {
            return Err(ReportError::Publishing {
                target: "Slack".to_string(),
                details: format!("Chart byte upload failed with status {}", upload_res.status()),
            });
        }

        let complete: SlackEnvelope = self
            .client
            .post(format!("{}/files.completeUploadExternal", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({
                "files": [{ "id": file_id, "title": title }],
                "channel_id": self.channel_id,
            }))
            .send()
            .await?
            .json()
            .await?;
        if !complete.ok {
            return Err(slack_error("files.completeUploadExternal", &complete));
        }

        info!("Uploaded chart '{}' to {}", title, self.channel_id);
        Ok(())
    }
}
