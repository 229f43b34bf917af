//! Session settings and validation.
//!
//! These are pure domain tunables with no infrastructure dependencies.
//! The turn-taking heuristics (debounce windows, looks-complete thresholds,
//! barge-in length) are deliberately configuration rather than constants:
//! they are tuned guesses balancing recognizer latency against perceived
//! responsiveness, not correctness contracts.

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Default debounce after a final-but-not-speech-final fragment.
pub const DEFAULT_FINAL_DEBOUNCE_MS: u64 = 500;

/// Default (shorter) debounce after seeding from an interim fragment.
pub const DEFAULT_INTERIM_DEBOUNCE_MS: u64 = 300;

/// Per-call pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionSettings {
    /// Debounce window armed after a final fragment without end-of-speech (ms).
    pub final_debounce_ms: u64,

    /// Debounce window armed after seeding from an interim fragment (ms).
    pub interim_debounce_ms: u64,

    /// "Looks complete" heuristic: minimum trimmed length for an interim
    /// fragment ending in terminal punctuation to be emitted early.
    pub looks_complete_min_chars: usize,

    /// "Looks complete" heuristic: minimum word count for a capitalized
    /// interim fragment to be emitted early.
    pub looks_complete_min_words: usize,

    /// Minimum candidate-utterance length that counts as a barge-in while
    /// the assistant is speaking.
    pub barge_in_min_chars: usize,

    /// Conversation history keeps this many recent exchanges on top of the
    /// fixed system prompt.
    pub max_history_exchanges: usize,

    /// Synthesized audio shorter than this is treated as an engine failure
    /// and dropped.
    pub min_synthesis_bytes: usize,

    /// Delay before speaking the greeting after `start`, letting the media
    /// stream settle (ms).
    pub greeting_delay_ms: u64,

    /// Transport liveness ping interval (ms). A peer silent for a full
    /// interval is terminated.
    pub heartbeat_interval_ms: u64,

    /// Fixed instruction prompt, always first in history.
    pub system_prompt: String,

    /// Spoken once when the call connects (unordered chunk).
    pub greeting: String,

    /// Spoken when a reply stream dies mid-generation (unordered chunk).
    pub fallback_reply: String,

    /// Outbound audio codec label forwarded with every media frame.
    pub codec: String,

    /// Outbound audio sample rate forwarded with every media frame.
    pub sample_rate: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            final_debounce_ms: DEFAULT_FINAL_DEBOUNCE_MS,
            interim_debounce_ms: DEFAULT_INTERIM_DEBOUNCE_MS,
            looks_complete_min_chars: 10,
            looks_complete_min_words: 6,
            barge_in_min_chars: 5,
            max_history_exchanges: 2,
            min_synthesis_bytes: 32,
            greeting_delay_ms: 200,
            heartbeat_interval_ms: 30_000,
            system_prompt: "Eres un asistente telefónico. Responde siempre en español, \
                            con frases breves y amigables, y no hagas más de una pregunta \
                            a la vez. Inserta el símbolo • en las pausas naturales del \
                            habla, cada pocas palabras."
                .to_string(),
            greeting: "Bienvenido. ¿Cómo le puedo ayudar?".to_string(),
            fallback_reply: "Disculpa, ¿podrías repetir?".to_string(),
            codec: "audio/x-mulaw".to_string(),
            sample_rate: 8000,
        }
    }
}

impl SessionSettings {
    /// Check that the settings describe a runnable session.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.final_debounce_ms == 0 {
            return Err(SettingsError::OutOfRange {
                field: "final_debounce_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if self.interim_debounce_ms == 0 {
            return Err(SettingsError::OutOfRange {
                field: "interim_debounce_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if self.sample_rate == 0 {
            return Err(SettingsError::OutOfRange {
                field: "sample_rate",
                reason: "must be greater than zero".into(),
            });
        }
        if self.system_prompt.trim().is_empty() {
            return Err(SettingsError::Missing("system_prompt"));
        }
        if self.fallback_reply.trim().is_empty() {
            return Err(SettingsError::Missing("fallback_reply"));
        }
        Ok(())
    }
}
