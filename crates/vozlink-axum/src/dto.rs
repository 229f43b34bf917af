//! Provider wire messages for the media-stream WebSocket.
//!
//! These are the JSON shapes the telephony provider speaks; they exist only
//! at this boundary. The ingest task decodes [`ProviderMessage`] into typed
//! [`vozlink_session::InboundEvent`]s, and [`WsMediaTransport`] serializes
//! [`OutboundMessage`]s on the way out.
//!
//! [`WsMediaTransport`]: crate::transport::WsMediaTransport

use serde::{Deserialize, Serialize};

// ── Inbound ────────────────────────────────────────────────────────

/// One inbound frame from the provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ProviderMessage {
    /// Handshake frame sent before `start`; carries nothing we need.
    Connected,

    /// The media stream is live.
    Start { start: StartMeta },

    /// One frame of caller audio.
    Media { media: MediaMeta },

    /// A previously sent playback marker finished playing.
    Mark { mark: MarkMeta },

    /// The media stream ended.
    Stop,
}

/// Stream identifiers delivered with `start`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMeta {
    pub stream_sid: String,
    pub call_sid: String,
}

/// Caller audio payload, base64 in the provider codec.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaMeta {
    pub payload: String,
}

/// Marker name echoed back by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkMeta {
    pub name: String,
}

// ── Outbound ───────────────────────────────────────────────────────

/// One outbound frame to the provider.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum OutboundMessage {
    /// Assistant audio for the caller.
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },

    /// Playback marker the provider echoes once preceding audio played out.
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: MarkMeta,
    },

    /// Flush the provider's playback queue immediately (barge-in).
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

/// Outbound audio payload with its fixed format metadata.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMedia {
    /// Base64 audio bytes.
    pub payload: String,
    /// Codec label, e.g. `audio/x-mulaw`.
    pub codec: String,
    #[serde(rename = "sampleRate")]
    pub sample_rate: u32,
}
