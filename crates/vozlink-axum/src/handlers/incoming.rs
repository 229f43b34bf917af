//! Provider call webhook.
//!
//! `POST /incoming` is hit by the telephony provider when a call arrives.
//! The XML answer tells it to open a bidirectional media stream to our
//! WebSocket endpoint, which is where the session actually lives.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::error::HttpError;
use crate::state::AppState;

/// `POST /incoming` — answer the call webhook with a connect-stream document.
pub async fn incoming_call(State(state): State<AppState>) -> Result<impl IntoResponse, HttpError> {
    if state.public_host.trim().is_empty() {
        return Err(HttpError::Internal("public hostname is not configured".into()));
    }

    let body = connect_stream_document(&state.public_host);
    Ok(([(header::CONTENT_TYPE, "text/xml")], body))
}

/// Build the `<Connect><Stream>` answer document.
fn connect_stream_document(host: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Response><Connect><Stream url=\"wss://{host}/connection\" /></Connect></Response>"
    )
}
