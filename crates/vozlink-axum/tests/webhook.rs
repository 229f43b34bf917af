//! Router-level tests for the webhook and upgrade endpoints.
//!
//! Uses `tower::ServiceExt::oneshot` against the real router with stub
//! engine clients — no network, no provider.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

use vozlink_axum::{AppState, AxumContext, build_router};
use vozlink_core::{
    ChatMessage, DeltaStream, ModelError, ReplyModel, SessionSettings, SpeechSynthesizer,
    SynthesisError,
};
use vozlink_engines::DeepgramConfig;

struct StubModel;

#[async_trait]
impl ReplyModel for StubModel {
    async fn stream_reply(&self, _messages: &[ChatMessage]) -> Result<DeltaStream, ModelError> {
        Ok(Box::pin(futures_util::stream::empty()))
    }
}

struct StubSynth;

#[async_trait]
impl SpeechSynthesizer for StubSynth {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, SynthesisError> {
        Ok(vec![0; 64])
    }
}

fn test_state(recognizer_key: &str) -> AppState {
    Arc::new(AxumContext::new(
        SessionSettings::default(),
        "voz.example.com".into(),
        DeepgramConfig {
            api_key: recognizer_key.into(),
            ..DeepgramConfig::default()
        },
        Arc::new(StubModel),
        Arc::new(StubSynth),
    ))
}

#[tokio::test]
async fn incoming_webhook_answers_with_connect_stream_xml() {
    let router = build_router(test_state("dg-key"));

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/incoming")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/xml"
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let xml = String::from_utf8(body.to_vec()).unwrap();
    assert!(xml.contains("wss://voz.example.com/connection"));
    assert!(xml.contains("<Connect><Stream"));
}

#[tokio::test]
async fn healthz_reports_ok() {
    let router = build_router(test_state("dg-key"));

    let response = router
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn connection_upgrade_is_refused_without_recognizer_credentials() {
    let router = build_router(test_state(""));

    let response = router
        .oneshot(upgrade_request())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn connection_upgrade_switches_protocols_when_configured() {
    let router = build_router(test_state("dg-key"));

    let response = router
        .oneshot(upgrade_request())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
}

fn upgrade_request() -> Request<Body> {
    Request::builder()
        .uri("/connection")
        .header(header::CONNECTION, "upgrade")
        .header(header::UPGRADE, "websocket")
        .header(header::SEC_WEBSOCKET_VERSION, "13")
        .header(header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ==")
        .body(Body::empty())
        .unwrap()
}
