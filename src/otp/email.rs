//! Outbound email port
//!
//! - [`HttpEmailSender`] - JSON POST to a transactional email API
//! - [`LogEmailSender`] - writes the message to the log (dev)
//! - [`MemoryOutbox`] - captures messages for tests

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::EmailConfig;
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> CoreResult<()>;
}

// ============================================================================
// HTTP
// ============================================================================

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

pub struct HttpEmailSender {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    from: String,
}

impl HttpEmailSender {
    pub fn new(config: &EmailConfig) -> CoreResult<Self> {
        let endpoint = config.endpoint.clone().ok_or_else(|| {
            CoreError::InvalidInput("email.endpoint is required for the http provider".into())
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                CoreError::ExternalServiceFailure(format!("Failed to create HTTP client: {}", e))
            })?;
        info!("Email delivery via {}", endpoint);
        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, message: &EmailMessage) -> CoreResult<()> {
        let mut request = self.client.post(&self.endpoint).json(&SendRequest {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CoreError::ExternalServiceFailure(format!("email send: {}", e)))?;
        if !response.status().is_success() {
            return Err(CoreError::ExternalServiceFailure(format!(
                "email provider returned {}",
                response.status()
            )));
        }
        debug!(to = %message.to, "Email sent");
        Ok(())
    }
}

// ============================================================================
// Log / memory
// ============================================================================

#[derive(Debug, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> CoreResult<()> {
        info!(to = %message.to, subject = %message.subject, body = %message.body, "Email (log provider)");
        Ok(())
    }
}

/// Records every message. Can be switched to fail for error-path tests.
#[derive(Debug, Default)]
pub struct MemoryOutbox {
    sent: Mutex<Vec<EmailMessage>>,
    failing: Mutex<bool>,
}

impl MemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap_or_else(|e| e.into_inner()) = failing;
    }

    pub fn messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last_to(&self, to: &str) -> Option<EmailMessage> {
        self.messages().into_iter().rev().find(|m| m.to == to)
    }

    /// The six-digit code of the latest message to `to`
    pub fn last_code(&self, to: &str) -> Option<String> {
        let body = self.last_to(to)?.body;
        body.split(|c: char| !c.is_ascii_digit())
            .find(|w| w.len() == 6)
            .map(str::to_string)
    }
}

#[async_trait]
impl EmailSender for MemoryOutbox {
    async fn send(&self, message: &EmailMessage) -> CoreResult<()> {
        if *self.failing.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(CoreError::ExternalServiceFailure(
                "outbox configured to fail".into(),
            ));
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_outbox_extracts_code() {
        let outbox = MemoryOutbox::new();
        outbox
            .send(&EmailMessage {
                to: "a@b.io".into(),
                subject: "Your code".into(),
                body: "Your verification code is 042917. It expires in 10 minutes.".into(),
            })
            .await
            .unwrap();
        assert_eq!(outbox.last_code("a@b.io").as_deref(), Some("042917"));
        assert!(outbox.last_code("c@d.io").is_none());

        outbox.set_failing(true);
        let err = outbox
            .send(&EmailMessage {
                to: "a@b.io".into(),
                subject: "s".into(),
                body: "b".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ExternalServiceFailure(_)));
        assert_eq!(outbox.messages().len(), 1);
    }

    #[test]
    fn test_http_sender_requires_endpoint() {
        assert!(HttpEmailSender::new(&EmailConfig::default()).is_err());
    }
}
