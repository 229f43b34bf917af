//! Core domain types and port definitions for vozlink.
//!
//! This crate is the hexagonal centre of the workspace: it defines the
//! domain vocabulary of a duplex phone-call session (chunks, recognition
//! events, conversation history messages) and the port traits through which
//! the session pipeline talks to the outside world (speech recognizer,
//! reply model, speech synthesizer, media transport).
//!
//! It must never depend on an adapter crate — conversions from wire shapes
//! happen in `vozlink-axum` and `vozlink-engines`, not here.
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod error;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{ChatMessage, ChatRole, RecognitionEvent, SpeechChunk};
pub use error::{ModelError, RecognizerError, SettingsError, SynthesisError, TransportError};
pub use ports::{
    DeltaStream, MediaTransport, RecognitionEvents, ReplyModel, SpeechRecognizer,
    SpeechSynthesizer,
};
pub use settings::SessionSettings;
