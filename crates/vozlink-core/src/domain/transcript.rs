//! Recognition events as emitted by a streaming speech recognizer.

use serde::{Deserialize, Serialize};

/// One transcript event from the recognizer.
///
/// Streaming recognizers refine their output in place: interim events
/// (`is_final == false`) may be rewritten by later ones, a final event
/// freezes a fragment, and `is_speech_final` is the engine's own judgement
/// that the speaker has paused naturally — the strongest end-of-turn signal
/// we get. The utterance accumulator turns this three-valued stream into
/// whole utterances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionEvent {
    /// Recognized text for this event (may be empty).
    pub text: String,

    /// Whether this fragment is frozen (will not be rewritten).
    pub is_final: bool,

    /// Whether the engine detected a natural end of speech.
    pub is_speech_final: bool,
}

impl RecognitionEvent {
    /// An interim (still mutable) fragment.
    #[must_use]
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            is_speech_final: false,
        }
    }

    /// A final fragment without an end-of-speech signal.
    #[must_use]
    pub fn final_fragment(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            is_speech_final: false,
        }
    }

    /// A final fragment that also closes the speaker's turn.
    #[must_use]
    pub fn speech_final(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            is_speech_final: true,
        }
    }

    /// True when the event carries no usable text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
