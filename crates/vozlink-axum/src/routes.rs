//! Router factory.

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the full application router:
///
/// - `POST /incoming` — provider call webhook, answers with `<Connect><Stream>`
/// - `GET /connection` — media-stream WebSocket upgrade
/// - `GET /healthz` — liveness probe
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/incoming", post(handlers::incoming::incoming_call))
        .route("/connection", get(handlers::call_ws::call_ws))
        .route("/healthz", get(handlers::healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
