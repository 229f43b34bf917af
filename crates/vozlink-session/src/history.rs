//! Bounded conversation history owned by the session coordinator.
//!
//! The fixed system prompt is always first and is never trimmed away; the
//! caller/assistant turns behind it are bounded to the most recent N
//! exchanges. Trimming happens only through the explicit [`trim`] call at
//! defined points (before each model dispatch), never mid-read.
//!
//! [`trim`]: ConversationHistory::trim

use std::collections::VecDeque;

use vozlink_core::{ChatMessage, ChatRole};

/// Ordered, bounded message history for one call.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    system: ChatMessage,
    turns: VecDeque<ChatMessage>,
    max_exchanges: usize,
}

impl ConversationHistory {
    /// Create a history holding only the system prompt.
    #[must_use]
    pub fn new(system_prompt: impl Into<String>, max_exchanges: usize) -> Self {
        Self {
            system: ChatMessage::system(system_prompt),
            turns: VecDeque::new(),
            max_exchanges,
        }
    }

    /// Append a caller turn.
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push_back(ChatMessage::user(text));
    }

    /// Append an assistant turn.
    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.turns.push_back(ChatMessage::assistant(text));
    }

    /// Drop the oldest turns until at most `max_exchanges` exchanges remain.
    ///
    /// The system prompt is untouchable; a half-open exchange (caller turn
    /// awaiting its reply) counts against the bound like a full one.
    pub fn trim(&mut self) {
        while self.turns.len() > self.max_exchanges * 2 {
            self.turns.pop_front();
        }
    }

    /// Snapshot of the window to send to the model, system prompt first.
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut out = Vec::with_capacity(1 + self.turns.len());
        out.push(self.system.clone());
        out.extend(self.turns.iter().cloned());
        out
    }

    /// Number of messages including the system prompt.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.turns.len()
    }

    /// Always false — the system prompt is permanent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}
