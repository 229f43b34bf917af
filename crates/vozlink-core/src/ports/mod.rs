//! Port traits — the session pipeline's only view of the outside world.
//!
//! # Design Rules
//!
//! - Traits here are transport-agnostic: no wire shapes, no provider JSON.
//!   Adapters (`vozlink-engines`, `vozlink-axum`) convert at their edge.
//! - Every cross-component event travels over a typed channel or a trait
//!   method — there is no listener registration anywhere in the workspace.

mod model;
mod recognizer;
mod synthesizer;
mod transport;

pub use model::{DeltaStream, ReplyModel};
pub use recognizer::{RecognitionEvents, SpeechRecognizer};
pub use synthesizer::SpeechSynthesizer;
pub use transport::MediaTransport;
