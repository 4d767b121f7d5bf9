use async_trait::async_trait;
use thiserror::Error;

use crate::models::{DeliveryReceipt, OutboundMessage, ResendEmailRequest, ResendEmailResponse};

// Upstream error bodies can be large, keep the detail readable
const MAX_DETAIL_LEN: usize = 512;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SendError {
    // names the missing piece, e.g. "resend" or "sender"
    #[error("{0} not configured")]
    NotConfigured(&'static str),
    #[error("{0}")]
    Failed(String),
}

/// Delivers one notification. Implementations make exactly one attempt.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, SendError>;
}

// Resend transactional email API
pub struct ResendTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    from: Option<String>,
}

impl ResendTransport {
    // client is expected to carry the send timeout
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: Option<String>,
        from: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            from: from.filter(|f| !f.trim().is_empty()),
        }
    }
}

#[async_trait]
impl Transport for ResendTransport {
    fn name(&self) -> &'static str {
        "resend"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, SendError> {
        let api_key = self.api_key.as_deref().ok_or(SendError::NotConfigured("resend"))?;
        let from = self.from.clone().ok_or(SendError::NotConfigured("sender"))?;

        let request = ResendEmailRequest {
            from,
            to: vec![message.to.clone()],
            subject: message.subject.clone(),
            text: message.text.clone(),
            html: message.html.clone(),
        };

        let res = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SendError::Failed(format!("request failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(SendError::Failed(truncate(format!("{}: {}", status, body.trim()))));
        }

        let body: ResendEmailResponse = res
            .json()
            .await
            .map_err(|e| SendError::Failed(format!("parse error: {}", e)))?;

        Ok(DeliveryReceipt {
            transport: self.name(),
            id: body.id,
        })
    }
}

// Development transport - logs instead of sending
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, SendError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.text,
            "Notification (log transport, not delivered)"
        );
        Ok(DeliveryReceipt {
            transport: self.name(),
            id: None,
        })
    }
}

fn truncate(mut detail: String) -> String {
    if detail.len() > MAX_DETAIL_LEN {
        let mut cut = MAX_DETAIL_LEN;
        while !detail.is_char_boundary(cut) {
            cut -= 1;
        }
        detail.truncate(cut);
        detail.push('…');
    }
    detail
}
