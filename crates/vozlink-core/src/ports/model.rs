//! Reply-model (streaming completion) port.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::domain::ChatMessage;
use crate::error::ModelError;

/// Lazy sequence of UTF-8 reply fragments, terminated by the stream ending.
///
/// An `Err` item means the generation broke mid-reply; consumers speak one
/// fallback chunk and terminate the interaction.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, ModelError>> + Send>>;

/// A language model that streams its reply incrementally.
#[async_trait]
pub trait ReplyModel: Send + Sync {
    /// Start one completion over the given history window.
    async fn stream_reply(&self, messages: &[ChatMessage]) -> Result<DeltaStream, ModelError>;
}
