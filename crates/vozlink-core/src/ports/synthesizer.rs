//! Speech-synthesis port.

use async_trait::async_trait;

use crate::error::SynthesisError;

/// A speech-synthesis engine.
///
/// Input text is already normalized for speech by the dispatcher; output is
/// raw audio bytes in the provider's playback codec (no transcoding here).
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize one chunk of text into audio bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError>;
}
