use axum::{Json, response::IntoResponse};

// health handler
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

// root - tells a curious caller what lives here
pub async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "ok": true,
        "service": "location-relay",
        "endpoints": ["/send-location"],
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
