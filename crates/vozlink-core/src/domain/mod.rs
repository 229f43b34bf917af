//! Domain types for the duplex call session.

mod chat;
mod chunk;
mod transcript;

pub use chat::{ChatMessage, ChatRole};
pub use chunk::SpeechChunk;
pub use transcript::RecognitionEvent;
