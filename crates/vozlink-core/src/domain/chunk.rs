//! Speakable fragments of an assistant reply.

use serde::{Deserialize, Serialize};

/// One speakable fragment of an assistant reply.
///
/// Chunks are produced by the reply segmenter with sequence indices
/// 0, 1, 2, … within their interaction, and reassembled into that order by
/// the delivery engine no matter how synthesis completions interleave.
///
/// A chunk with `sequence: None` is *unordered*: it bypasses reordering and
/// is delivered immediately. Used for the call greeting and for the spoken
/// fallback when a reply stream dies mid-generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechChunk {
    /// Interaction this chunk belongs to.
    pub interaction: u64,

    /// Position within the interaction's reply, or `None` for out-of-band.
    pub sequence: Option<u64>,

    /// Text to synthesize.
    pub text: String,
}

impl SpeechChunk {
    /// Create an ordered chunk.
    #[must_use]
    pub fn ordered(interaction: u64, sequence: u64, text: impl Into<String>) -> Self {
        Self {
            interaction,
            sequence: Some(sequence),
            text: text.into(),
        }
    }

    /// Create an unordered (immediate-delivery) chunk.
    #[must_use]
    pub fn unordered(interaction: u64, text: impl Into<String>) -> Self {
        Self {
            interaction,
            sequence: None,
            text: text.into(),
        }
    }
}
