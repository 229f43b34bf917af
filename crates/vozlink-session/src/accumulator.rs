//! Utterance accumulation — turning a recognizer's event stream into whole
//! caller utterances.
//!
//! The recognizer reports three kinds of events: interim fragments (still
//! mutable), final fragments (frozen), and final fragments carrying the
//! engine's own end-of-speech judgement. The accumulator folds these into
//! one utterance per caller turn:
//!
//! - final + speech-final: emit immediately — terminal for the utterance.
//! - final only: append and arm a debounce; silence completes the turn.
//! - interim: report a [`UtteranceEvent::Candidate`] (the barge-in signal),
//!   emit early when the text already "looks complete", otherwise seed the
//!   buffer and arm a shorter debounce.
//!
//! The accumulator is sans-IO: it never sleeps itself. It exposes the armed
//! deadline through [`flush_deadline`] and the coordinator's select loop
//! calls [`flush`] when that instant passes. Over-eager flushing truncates
//! sentences and over-cautious flushing adds dead air, which is why every
//! threshold here comes from [`SessionSettings`] rather than a constant.
//!
//! [`flush_deadline`]: UtteranceAccumulator::flush_deadline
//! [`flush`]: UtteranceAccumulator::flush

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use vozlink_core::{RecognitionEvent, SessionSettings};

/// Punctuation that lets an interim fragment count as "looks complete".
const TERMINAL_PUNCTUATION: [char; 6] = ['.', '?', '!', ',', ';', ':'];

/// Output of feeding one recognition event into the accumulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtteranceEvent {
    /// Interim speech that may become an utterance — long candidates while
    /// the assistant is speaking trigger barge-in.
    Candidate(String),

    /// A complete caller utterance, emitted exactly once per turn.
    Completed(String),
}

/// Folds recognizer events into whole utterances.
#[derive(Debug)]
pub struct UtteranceAccumulator {
    settings: SessionSettings,
    /// Frozen (final) fragments accumulated for the current turn.
    partial: String,
    /// Interim text held only while no final fragment has arrived yet.
    /// Replaced — never concatenated — by the first final fragment, so an
    /// interim later upgraded to a final is not spoken twice.
    interim_seed: Option<String>,
    deadline: Option<Instant>,
    paused: bool,
}

impl UtteranceAccumulator {
    /// Create an accumulator with the given turn-taking settings.
    #[must_use]
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            partial: String::new(),
            interim_seed: None,
            deadline: None,
            paused: false,
        }
    }

    /// Feed one recognition event. Malformed (empty) events are ignored.
    pub fn on_recognition_event(&mut self, event: &RecognitionEvent) -> Option<UtteranceEvent> {
        if self.paused || event.is_empty() {
            return None;
        }

        let text = event.text.trim();

        if event.is_final && event.is_speech_final {
            let utterance = self.complete_with(text);
            return Some(UtteranceEvent::Completed(utterance));
        }

        if event.is_final {
            // Frozen fragment without end-of-speech: keep accumulating and
            // wait out the debounce in case the caller keeps talking.
            self.interim_seed = None;
            self.append_final(text);
            self.arm(self.settings.final_debounce_ms);
            return None;
        }

        // Interim fragment.
        if self.looks_complete(text) {
            let utterance = self.complete_with(text);
            return Some(UtteranceEvent::Completed(utterance));
        }

        if self.partial.is_empty() {
            // Seed (or refresh) from the interim and restart the shorter
            // debounce: it fires only once the recognizer goes quiet.
            self.interim_seed = Some(text.to_string());
            self.arm(self.settings.interim_debounce_ms);
        }

        Some(UtteranceEvent::Candidate(text.to_string()))
    }

    /// When the armed debounce expires, if any.
    #[must_use]
    pub fn flush_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fire the debounce: whatever is accumulated becomes the utterance,
    /// treating the silence as turn completion.
    pub fn flush(&mut self) -> Option<String> {
        self.deadline = None;
        let text = if self.partial.is_empty() {
            self.interim_seed.take()?
        } else {
            std::mem::take(&mut self.partial)
        };
        self.interim_seed = None;

        let text = text.trim().to_string();
        if text.is_empty() {
            return None;
        }
        debug!(len = text.len(), "Debounce expired, flushing utterance");
        Some(text)
    }

    /// Stop ingesting events (recognized text is dropped while paused).
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume ingesting events.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Whether ingestion is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    // ── Internal helpers ───────────────────────────────────────────

    /// Heuristic guess that an interim fragment is already a finished
    /// sentence: long enough and terminally punctuated, or several words
    /// starting with a capital. A tunable guess, not a correctness contract.
    fn looks_complete(&self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.chars().count() > self.settings.looks_complete_min_chars
            && trimmed.ends_with(&TERMINAL_PUNCTUATION[..])
        {
            return true;
        }

        let words = trimmed.split_whitespace().count();
        words >= self.settings.looks_complete_min_words
            && trimmed.chars().next().is_some_and(char::is_uppercase)
    }

    /// Terminal emission: accumulated finals plus the closing fragment.
    fn complete_with(&mut self, tail: &str) -> String {
        let mut text = std::mem::take(&mut self.partial);
        if !text.is_empty() && !tail.is_empty() {
            text.push(' ');
        }
        text.push_str(tail);
        self.interim_seed = None;
        self.deadline = None;
        text.trim().to_string()
    }

    fn append_final(&mut self, text: &str) {
        if !self.partial.is_empty() {
            self.partial.push(' ');
        }
        self.partial.push_str(text);
    }

    fn arm(&mut self, window_ms: u64) {
        self.deadline = Some(Instant::now() + Duration::from_millis(window_ms));
    }
}
