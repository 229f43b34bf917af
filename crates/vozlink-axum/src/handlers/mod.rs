//! HTTP and WebSocket handlers.

pub mod call_ws;
pub mod incoming;

use axum::Json;

/// `GET /healthz` — liveness probe.
pub async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
