//! Failure notifications
//!
//! A failed run produces one [`FailureNotice`], delivered by email through the
//! SparkPost transmissions API.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::NotifyConfig;
use crate::error::{Result, SyncError};

/// Default HTTP timeout for notification requests.
pub const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 30;

/// What an operator is told about a failed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureNotice {
    pub collection: String,
    pub stage: String,
    pub error: String,
}

impl FailureNotice {
    /// HTML body: the error text, then the collection name
    pub fn html_body(&self) -> String {
        format!(
            "<p>{}</p><br>\n<p>{}</p>\n<p>Stage: {}</p>",
            escape_html(&self.error),
            escape_html(&self.collection),
            escape_html(&self.stage)
        )
    }
}

/// Outbound operator notification
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &FailureNotice) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct Transmission<'a> {
    options: TransmissionOptions,
    recipients: Vec<Recipient<'a>>,
    content: Content<'a>,
}

#[derive(Debug, Serialize)]
struct TransmissionOptions {
    sandbox: bool,
}

#[derive(Debug, Serialize)]
struct Recipient<'a> {
    address: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    from: &'a str,
    subject: &'a str,
    html: String,
}

/// [`Notifier`] that sends mail through SparkPost
pub struct SparkPostNotifier {
    client: reqwest::Client,
    config: NotifyConfig,
}

impl SparkPostNotifier {
    pub fn new(config: NotifyConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_NOTIFY_TIMEOUT_SECS))
            .build()
            .map_err(|e| SyncError::notify(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/api/v1/transmissions",
            self.config.api_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Notifier for SparkPostNotifier {
    #[instrument(skip(self, notice), fields(collection = %notice.collection))]
    async fn notify(&self, notice: &FailureNotice) -> Result<()> {
        let body = Transmission {
            options: TransmissionOptions {
                sandbox: self.config.sandbox,
            },
            recipients: self
                .config
                .recipients
                .iter()
                .map(|address| Recipient { address })
                .collect(),
            content: Content {
                from: &self.config.from,
                subject: &self.config.subject,
                html: notice.html_body(),
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header(reqwest::header::AUTHORIZATION, &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::notify(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SyncError::notify(format!(
                "SparkPost returned {}: {}",
                status, detail
            )));
        }

        debug!(recipients = self.config.recipients.len(), "Failure notification sent");
        Ok(())
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
