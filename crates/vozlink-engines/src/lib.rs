//! External engine adapters for vozlink.
//!
//! Each module implements one `vozlink-core` port against a real service:
//!
//! - [`deepgram`] — live speech recognition over a streaming WebSocket
//! - [`openai`] — OpenAI-compatible streaming chat completions (any
//!   compatible base URL works; the default points at Perplexity)
//! - [`elevenlabs`] — HTTP speech synthesis returning provider-ready audio
//!
//! Adapters convert wire shapes at this boundary; nothing upstream of the
//! port traits ever sees provider JSON.
#![deny(unused_crate_dependencies)]

pub mod deepgram;
pub mod elevenlabs;
pub mod openai;

pub use deepgram::{DeepgramConfig, DeepgramRecognizer};
pub use elevenlabs::{ElevenLabsSynthesizer, SynthesisConfig};
pub use openai::{CompletionConfig, OpenAiReplyModel};
