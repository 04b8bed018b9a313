//! Outbound player notifications.
//!
//! Coordinators treat delivery as fire-and-forget: a failed send is logged
//! and never rolls back or blocks the primary transition. The transport
//! reports "recipient gone" distinctly so the external subscription
//! cleanup can react.

use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::storage::config::NotifierConfig;

#[derive(Error, Debug)]
pub enum NotifyError {
    /// The recipient's push subscription no longer exists.
    #[error("recipient gone")]
    RecipientGone,

    /// Transport-level delivery failure.
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Push-notification transport.
pub trait Notifier: Send + Sync {
    fn send(&self, user_id: Uuid, title: &str, body: &str, url: &str) -> Result<(), NotifyError>;
}

/// Transport that drops every message. For callers without push delivery.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn send(&self, _user_id: Uuid, _title: &str, _body: &str, _url: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Posts notification payloads as JSON to a configured webhook endpoint.
pub struct WebhookNotifier {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl WebhookNotifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Build from config; `None` when notifications are disabled or no
    /// endpoint is set.
    pub fn from_config(config: &NotifierConfig) -> Option<Self> {
        if !config.enabled || config.webhook_url.is_empty() {
            return None;
        }
        Some(Self::new(config.webhook_url.clone()))
    }
}

impl Notifier for WebhookNotifier {
    fn send(&self, user_id: Uuid, title: &str, body: &str, url: &str) -> Result<(), NotifyError> {
        let payload = json!({
            "user_id": user_id,
            "title": title,
            "body": body,
            "url": url,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else if status.as_u16() == 404 || status.as_u16() == 410 {
            Err(NotifyError::RecipientGone)
        } else {
            let text = resp.text().unwrap_or_default();
            Err(NotifyError::Delivery(format!("HTTP {status}: {text}")))
        }
    }
}
