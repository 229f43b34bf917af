//! WebSocket-backed media transport.
//!
//! Implements the session pipeline's [`MediaTransport`] port over a bounded
//! channel of serialized frames that the WS egress task drains in order.
//! The channel's backpressure is the transport's flow control: the delivery
//! engine awaits `send_media`, so a slow socket slows the drain instead of
//! piling up audio.
//!
//! The stream id arrives only with the provider's `start` frame, so the
//! ingest task sets it here before forwarding the event; sends before that
//! point fail soft (the delivery engine logs and skips).

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::sync::mpsc;

use vozlink_core::{MediaTransport, TransportError};

use crate::dto::{MarkMeta, OutboundMedia, OutboundMessage};

/// Outbound frames buffered toward the egress task (~a few seconds of
/// speech at phone frame sizes).
pub const OUTBOUND_CHANNEL_CAPACITY: usize = 64;

/// [`MediaTransport`] writing provider JSON frames to the egress channel.
pub struct WsMediaTransport {
    frames: mpsc::Sender<String>,
    stream_sid: OnceLock<String>,
    closed: AtomicBool,
    codec: String,
    sample_rate: u32,
}

impl WsMediaTransport {
    /// Create the transport and the receiver the egress task drains.
    #[must_use]
    pub fn new(codec: String, sample_rate: u32) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
        (
            Self {
                frames: tx,
                stream_sid: OnceLock::new(),
                closed: AtomicBool::new(false),
                codec,
                sample_rate,
            },
            rx,
        )
    }

    /// Record the stream id from the provider's `start` frame. Later calls
    /// are ignored — one transport serves exactly one stream.
    pub fn set_stream_sid(&self, stream_sid: &str) {
        let _ = self.stream_sid.set(stream_sid.to_string());
    }

    /// Mark the connection closed; subsequent sends fail soft.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn stream_sid(&self) -> Result<String, TransportError> {
        self.stream_sid
            .get()
            .cloned()
            .ok_or_else(|| TransportError::Send("stream not started".into()))
    }

    async fn enqueue(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let json = serde_json::to_string(message)
            .map_err(|e| TransportError::Send(e.to_string()))?;
        self.frames.send(json).await.map_err(|_| {
            self.close();
            TransportError::NotOpen
        })
    }
}

#[async_trait]
impl MediaTransport for WsMediaTransport {
    async fn send_media(&self, payload: &[u8]) -> Result<(), TransportError> {
        let stream_sid = self.stream_sid()?;
        self.enqueue(&OutboundMessage::Media {
            stream_sid,
            media: OutboundMedia {
                payload: BASE64.encode(payload),
                codec: self.codec.clone(),
                sample_rate: self.sample_rate,
            },
        })
        .await
    }

    async fn send_mark(&self, name: &str) -> Result<(), TransportError> {
        let stream_sid = self.stream_sid()?;
        self.enqueue(&OutboundMessage::Mark {
            stream_sid,
            mark: MarkMeta { name: name.to_string() },
        })
        .await
    }

    async fn send_clear(&self) -> Result<(), TransportError> {
        let stream_sid = self.stream_sid()?;
        self.enqueue(&OutboundMessage::Clear { stream_sid }).await
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && !self.frames.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> (WsMediaTransport, mpsc::Receiver<String>) {
        WsMediaTransport::new("audio/x-mulaw".into(), 8000)
    }

    #[tokio::test]
    async fn media_frame_is_base64_with_format_metadata() {
        let (transport, mut rx) = transport();
        transport.set_stream_sid("MZ1");

        transport.send_media(b"ABC").await.unwrap();
        let frame: serde_json::Value =
            serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(frame["event"], "media");
        assert_eq!(frame["streamSid"], "MZ1");
        assert_eq!(frame["media"]["payload"], "QUJD");
        assert_eq!(frame["media"]["codec"], "audio/x-mulaw");
        assert_eq!(frame["media"]["sampleRate"], 8000);
    }

    #[tokio::test]
    async fn frames_preserve_send_order() {
        let (transport, mut rx) = transport();
        transport.set_stream_sid("MZ1");

        transport.send_media(b"a").await.unwrap();
        transport.send_mark("m-1").await.unwrap();
        transport.send_clear().await.unwrap();

        let events: Vec<String> = [
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
        ]
        .iter()
        .map(|raw| {
            serde_json::from_str::<serde_json::Value>(raw).unwrap()["event"]
                .as_str()
                .unwrap()
                .to_string()
        })
        .collect();
        assert_eq!(events, ["media", "mark", "clear"]);
    }

    #[tokio::test]
    async fn send_before_start_fails_soft() {
        let (transport, _rx) = transport();
        let err = transport.send_media(b"x").await.unwrap_err();
        assert!(matches!(err, TransportError::Send(_)));
    }

    #[tokio::test]
    async fn dropped_receiver_closes_the_transport() {
        let (transport, rx) = transport();
        transport.set_stream_sid("MZ1");
        assert!(transport.is_open());

        drop(rx);
        assert!(!transport.is_open());
        assert!(matches!(
            transport.send_mark("m").await.unwrap_err(),
            TransportError::NotOpen
        ));
    }

    #[tokio::test]
    async fn stream_sid_is_set_once() {
        let (transport, mut rx) = transport();
        transport.set_stream_sid("first");
        transport.set_stream_sid("second");
        transport.send_clear().await.unwrap();
        let frame: serde_json::Value =
            serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(frame["streamSid"], "first");
    }
}
