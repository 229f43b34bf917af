//! Error types shared across the workspace.
//!
//! One enum per external concern, following the per-item / stream-level /
//! connection-level taxonomy: adapters map their native failures into these,
//! and the session pipeline decides severity (drop the item, speak a
//! fallback, or tear the session down).

use thiserror::Error;

/// Errors surfaced by a speech-recognition engine adapter.
#[derive(Debug, Error)]
pub enum RecognizerError {
    /// Could not establish the recognizer connection.
    #[error("Failed to connect to recognizer: {0}")]
    Connect(String),

    /// The recognizer connection dropped or refused an audio frame.
    #[error("Recognizer transport error: {0}")]
    Transport(String),

    /// The engine sent a payload we could not understand.
    #[error("Malformed recognizer event: {0}")]
    Malformed(String),
}

/// Errors surfaced by a reply-model (completion) adapter.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Request could not be sent or the server rejected it outright.
    #[error("Completion request failed: {0}")]
    Request(String),

    /// The delta stream broke mid-generation.
    #[error("Completion stream error: {0}")]
    Stream(String),

    /// A streamed payload could not be decoded.
    #[error("Malformed completion delta: {0}")]
    Malformed(String),
}

/// Errors surfaced by a speech-synthesis adapter.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The synthesis call itself failed.
    #[error("Speech synthesis failed: {0}")]
    Engine(String),

    /// The engine returned audio too short to be playable.
    #[error("Synthesized audio too short: {got} bytes (minimum {min})")]
    TooShort { got: usize, min: usize },
}

/// Errors surfaced by the outbound media transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection is closed or closing; sends are soft-skipped.
    #[error("Transport is not open")]
    NotOpen,

    /// A frame could not be queued or written.
    #[error("Transport send failed: {0}")]
    Send(String),
}

/// Errors from settings validation.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A numeric field is outside its accepted range.
    #[error("Invalid setting {field}: {reason}")]
    OutOfRange { field: &'static str, reason: String },

    /// A required field is missing or empty.
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}
