//! HTTP push delivery of owner warnings.

use crate::notify::{Notifier, NotifyError};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info, instrument};

#[derive(Debug, Serialize)]
struct WarningPayload<'a> {
    recipient: &'a str,
    message: &'a str,
    sent_at: i64,
}

/// POSTs warnings as JSON to a fixed endpoint.
pub struct WebhookNotifier {
    endpoint_url: String,
    http_client: reqwest::Client,
}

impl WebhookNotifier {
    /// Notifier posting to `endpoint_url`, each request bounded by `timeout`.
    pub fn new(endpoint_url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(WebhookNotifier {
            endpoint_url: endpoint_url.into(),
            http_client,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    #[instrument(skip(self, message), fields(endpoint = %self.endpoint_url))]
    async fn send(&self, recipient_guid: &str, message: &str) -> Result<(), NotifyError> {
        let start = std::time::Instant::now();
        let payload = WarningPayload {
            recipient: recipient_guid,
            message,
            sent_at: Utc::now().timestamp(),
        };

        let response = self
            .http_client
            .post(&self.endpoint_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifyError::Timeout
                } else {
                    NotifyError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = status.as_u16(), "Warning delivery rejected");
            return Err(NotifyError::Rejected(status.as_u16()));
        }

        info!(
            delivery_time_ms = start.elapsed().as_millis() as u64,
            "Warning delivered"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}
