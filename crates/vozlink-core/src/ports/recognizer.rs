//! Speech-recognition port.

use async_trait::async_trait;

use crate::domain::RecognitionEvent;
use crate::error::RecognizerError;

/// Receiving half for recognizer events.
///
/// Adapters hand one of these out when they connect; the session coordinator
/// owns it for the lifetime of the call. When the adapter's connection dies
/// the channel closes, which the coordinator observes as end-of-events.
pub type RecognitionEvents = tokio::sync::mpsc::Receiver<RecognitionEvent>;

/// A live speech-recognition session.
///
/// The engine runs continuously for the whole call — caller interruption is
/// detected from transcript length heuristics downstream, not by muting the
/// recognizer while the assistant speaks.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Forward raw caller audio (provider codec pass-through) to the engine.
    async fn send_audio(&self, audio: &[u8]) -> Result<(), RecognizerError>;

    /// Close the recognition session cleanly.
    async fn finish(&self) -> Result<(), RecognizerError>;
}
