use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthFailure;
use crate::metrics::REJECTIONS;
use crate::rate_limit::LimitScope;
use crate::transport::SendError;
use crate::validation::ValidationIssue;

/// Every way a `/send-location` request can end without `{"ok": true}`.
#[derive(Debug, Error)]
pub enum RelayError {
    // `disclose` adds the reason to the body (deployment policy)
    #[error("unauthorized: {reason}")]
    Unauthorized { reason: AuthFailure, disclose: bool },

    #[error("too many requests ({})", .0.as_str())]
    RateLimited(LimitScope),

    #[error("invalid payload: {}", join_issues(.0))]
    InvalidPayload(Vec<ValidationIssue>),

    #[error("payload too large")]
    PayloadTooLarge,

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("{0} not configured")]
    NotConfigured(&'static str),
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<SendError> for RelayError {
    fn from(err: SendError) -> Self {
        match err {
            SendError::NotConfigured(missing) => RelayError::NotConfigured(missing),
            SendError::Failed(detail) => RelayError::SendFailed(detail),
        }
    }
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            RelayError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            RelayError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            RelayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::SendFailed(_) => StatusCode::BAD_GATEWAY,
            RelayError::NotConfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Pipeline stage that stopped the request, None for delivery outcomes
    fn rejection_stage(&self) -> Option<&'static str> {
        match self {
            RelayError::Unauthorized { .. } => Some("unauthorized"),
            RelayError::RateLimited(_) => Some("rate_limited"),
            RelayError::InvalidPayload(_) | RelayError::PayloadTooLarge => Some("invalid_payload"),
            RelayError::SendFailed(_) | RelayError::NotConfigured(_) => None,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        if let Some(stage) = self.rejection_stage() {
            REJECTIONS.with_label_values(&[stage]).inc();
        }

        let body = match &self {
            RelayError::Unauthorized { reason, disclose: true } => {
                json!({"error": "unauthorized", "reason": reason.as_str()})
            }
            RelayError::Unauthorized { .. } => json!({"error": "unauthorized"}),
            RelayError::RateLimited(_) => json!({"error": "too_many_requests"}),
            RelayError::InvalidPayload(_) => json!({"error": "invalid_payload"}),
            RelayError::PayloadTooLarge => json!({"error": "payload_too_large"}),
            RelayError::SendFailed(detail) => json!({"error": "send_failed", "detail": detail}),
            RelayError::NotConfigured(missing) => {
                json!({"error": format!("{}_not_configured", missing)})
            }
        };

        (self.status_code(), Json(body)).into_response()
    }
}
