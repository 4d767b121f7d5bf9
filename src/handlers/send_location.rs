use axum::{
    Json,
    body::{Body, Bytes},
    extract::{ConnectInfo, State},
    http::{HeaderMap, header::AUTHORIZATION},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::{Value, json};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::auth::authorize;
use crate::error::RelayError;
use crate::metrics::REQUEST_TOTAL;
use crate::rate_limit::FixedWindowLimiter;
use crate::state::AppState;
use crate::validation::{ValidationIssue, device_key, validate};

// Location payloads are tiny
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// `POST /send-location`
///
/// Guards run in order: bearer token, per-IP limit, per-device limit,
/// payload validation. Only a request that passes all of them reaches the
/// dispatcher, which makes a single delivery attempt.
///
/// The body is taken raw and only read once the token has been accepted.
pub async fn send_location_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<Value>, RelayError> {
    REQUEST_TOTAL.inc();

    if let Err(reason) = authorize(headers.get(AUTHORIZATION), &state.tokens) {
        tracing::warn!(peer = %peer, reason = %reason, "Rejected: unauthorized");
        return Err(RelayError::Unauthorized {
            reason,
            disclose: state.disclose_auth_reason,
        });
    }

    let ip = client_ip(&headers, peer, state.trust_forwarded_for);
    check_limit(&state.limiters.ip, &ip.to_string())?;

    let body = read_body(body).await?;

    // not JSON at all -> no device key, validation rejects it below
    let payload: Option<Value> = serde_json::from_slice(&body).ok();
    if let Some(device) = payload.as_ref().and_then(device_key) {
        check_limit(&state.limiters.device, device)?;
    }

    let Some(payload) = payload else {
        tracing::info!(ip = %ip, "Rejected: body is not JSON");
        return Err(RelayError::InvalidPayload(vec![ValidationIssue {
            field: "body",
            message: "not valid JSON".to_string(),
        }]));
    };

    let report = validate(&payload).map_err(|issues| {
        let err = RelayError::InvalidPayload(issues);
        tracing::info!(ip = %ip, error = %err, "Rejected: invalid payload");
        err
    })?;

    state.dispatcher.dispatch(&report).await?;

    Ok(Json(json!({ "ok": true })))
}

async fn read_body(body: Body) -> Result<Bytes, RelayError> {
    match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(RelayError::PayloadTooLarge),
        Err(e) => {
            tracing::info!(error = %e, "Rejected: body could not be read");
            Err(RelayError::InvalidPayload(vec![ValidationIssue {
                field: "body",
                message: "could not be read".to_string(),
            }]))
        }
    }
}

fn check_limit(limiter: &FixedWindowLimiter, key: &str) -> Result<(), RelayError> {
    if limiter.check(key) {
        return Ok(());
    }
    tracing::warn!(
        scope = limiter.scope().as_str(),
        key = %key,
        "Rejected: rate limit exceeded"
    );
    Err(RelayError::RateLimited(limiter.scope()))
}

// Peer address, or the first valid X-Forwarded-For entry when behind a proxy
fn client_ip(headers: &HeaderMap, peer: SocketAddr, trust_forwarded_for: bool) -> IpAddr {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').find_map(|s| s.trim().parse::<IpAddr>().ok()));
        if let Some(ip) = forwarded {
            return ip;
        }
    }
    peer.ip()
}
