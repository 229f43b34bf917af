//! WebSocket handler for the call media stream.
//!
//! `GET /connection` upgrades to the provider's bidirectional media
//! WebSocket. Per call, the handler:
//!
//! 1. Opens a live recognizer connection and builds the channel-backed
//!    [`WsMediaTransport`] pair.
//! 2. Spawns the [`SessionCoordinator`] with the shared model and
//!    synthesizer clients.
//! 3. Runs two tasks against the split socket:
//!    * **Ingest** — decodes provider JSON frames into typed
//!      [`InboundEvent`]s (base64 media decoded here), tracks pongs for
//!      liveness.
//!    * **Egress** — drains the transport's serialized frames onto the
//!      socket and pings on the heartbeat interval; a peer that misses a
//!      full interval is terminated.
//! 4. `tokio::select!` waits for either task, aborts the other, closes the
//!    transport, and waits for the coordinator to tear the session down
//!    (which closes the recognizer).
//!
//! Dropping the ingest task's `InboundEvent` sender is what ends the
//! coordinator on abrupt disconnects — no separate shutdown signal exists.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use vozlink_engines::DeepgramRecognizer;
use vozlink_session::{InboundEvent, SessionCoordinator};

use crate::dto::ProviderMessage;
use crate::error::HttpError;
use crate::state::AppState;
use crate::transport::WsMediaTransport;

/// Inbound events buffered toward the coordinator.
const INBOUND_CHANNEL_CAPACITY: usize = 64;

/// `GET /connection` — media-stream WebSocket upgrade.
pub async fn call_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Result<Response, HttpError> {
    if state.recognizer_config.api_key.is_empty() {
        return Err(HttpError::ServiceUnavailable(
            "recognizer is not configured".into(),
        ));
    }
    Ok(ws.on_upgrade(move |socket| handle_call(socket, state)).into_response())
}

async fn handle_call(socket: WebSocket, state: AppState) {
    // One recognizer connection per call, open for the call's lifetime.
    let (recognizer, recognition_rx) =
        match DeepgramRecognizer::connect(&state.recognizer_config).await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Recognizer connect failed, dropping call");
                return;
            }
        };

    let (transport, frames_rx) = WsMediaTransport::new(
        state.settings.codec.clone(),
        state.settings.sample_rate,
    );
    let transport = Arc::new(transport);
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);

    let coordinator = SessionCoordinator::new(
        state.settings.clone(),
        Arc::clone(&transport) as Arc<dyn vozlink_core::MediaTransport>,
        Arc::new(recognizer),
        Arc::clone(&state.model),
        Arc::clone(&state.synthesizer),
        inbound_rx,
        recognition_rx,
    );
    let session = tokio::spawn(coordinator.run());
    info!("Call WebSocket session opened");

    let (ws_sender, ws_receiver) = socket.split();
    let peer_alive = Arc::new(AtomicBool::new(true));

    let mut ingest = tokio::spawn(ingest_loop(
        ws_receiver,
        inbound_tx,
        Arc::clone(&transport),
        Arc::clone(&peer_alive),
    ));
    let heartbeat = Duration::from_millis(state.settings.heartbeat_interval_ms);
    let mut egress = tokio::spawn(egress_loop(ws_sender, frames_rx, peer_alive, heartbeat));

    // Whichever side finishes first (graceful close, network drop, dead
    // heartbeat) takes the other down with it.
    tokio::select! {
        _ = &mut ingest => { egress.abort(); }
        _ = &mut egress => { ingest.abort(); }
    }

    transport.close();
    if let Err(e) = session.await {
        warn!(error = %e, "Session task ended abnormally");
    }
    info!("Call WebSocket session closed");
}

// ── Ingest: provider JSON frames → typed inbound events ────────────

async fn ingest_loop(
    mut ws_receiver: SplitStream<WebSocket>,
    inbound: mpsc::Sender<InboundEvent>,
    transport: Arc<WsMediaTransport>,
    peer_alive: Arc<AtomicBool>,
) {
    while let Some(message) = ws_receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let Some(event) = decode_frame(&text, &transport) else {
                    continue;
                };
                let stop = event == InboundEvent::Stop;
                if inbound.send(event).await.is_err() {
                    // Coordinator is gone; nothing left to feed.
                    break;
                }
                if stop {
                    break;
                }
            }
            Ok(Message::Pong(_)) => {
                peer_alive.store(true, Ordering::SeqCst);
            }
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }
    // inbound is dropped here, which ends the coordinator's select loop.
    debug!("Ingest task exiting");
}

/// Decode one provider frame; returns `None` for frames that carry nothing
/// for the session (handshake, malformed payloads).
fn decode_frame(text: &str, transport: &WsMediaTransport) -> Option<InboundEvent> {
    let message = match serde_json::from_str::<ProviderMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "Unrecognized provider frame, skipping");
            return None;
        }
    };

    match message {
        ProviderMessage::Connected => {
            debug!("Provider handshake received");
            None
        }
        ProviderMessage::Start { start } => {
            // The transport needs the stream id before any outbound frame.
            transport.set_stream_sid(&start.stream_sid);
            Some(InboundEvent::Start {
                stream_id: start.stream_sid,
                call_id: start.call_sid,
            })
        }
        ProviderMessage::Media { media } => match BASE64.decode(media.payload.as_bytes()) {
            Ok(payload) => Some(InboundEvent::Media { payload }),
            Err(e) => {
                warn!(error = %e, "Malformed media payload, skipping");
                None
            }
        },
        ProviderMessage::Mark { mark } => Some(InboundEvent::MarkAcknowledged { name: mark.name }),
        ProviderMessage::Stop => Some(InboundEvent::Stop),
    }
}

// ── Egress: serialized frames → socket, plus heartbeat ─────────────

async fn egress_loop(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut frames: mpsc::Receiver<String>,
    peer_alive: Arc<AtomicBool>,
    heartbeat: Duration,
) {
    let mut ticker = tokio::time::interval(heartbeat);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so the liveness
    // check starts one full interval from now.
    ticker.tick().await;

    loop {
        tokio::select! {
            maybe = frames.recv() => match maybe {
                Some(json) => {
                    if ws_sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            _ = ticker.tick() => {
                if !peer_alive.swap(false, Ordering::SeqCst) {
                    warn!("Peer missed heartbeat window, terminating connection");
                    break;
                }
                if ws_sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }
    debug!("Egress task exiting");
}
