//! Incremental reply segmentation.
//!
//! The reply model streams text in arbitrary fragments; the segmenter cuts
//! that stream into speakable chunks at pause markers so synthesis can start
//! long before the full reply exists. Each chunk gets the next sequence
//! index for its interaction — the delivery engine relies on those indices
//! to rebuild the original order from out-of-order synthesis completions.

use vozlink_core::SpeechChunk;

/// Marker the model is prompted to emit at natural speech pauses.
pub const PAUSE_MARKER: char = '•';

/// Cuts one interaction's delta stream into ordered [`SpeechChunk`]s.
#[derive(Debug)]
pub struct ReplySegmenter {
    interaction: u64,
    next_sequence: u64,
    buffer: String,
    complete: String,
}

impl ReplySegmenter {
    /// Start segmenting a new interaction's reply.
    #[must_use]
    pub fn new(interaction: u64) -> Self {
        Self {
            interaction,
            next_sequence: 0,
            buffer: String::new(),
            complete: String::new(),
        }
    }

    /// Feed one delta; returns a chunk when the buffer closes at a pause
    /// marker.
    pub fn push_delta(&mut self, delta: &str) -> Option<SpeechChunk> {
        self.buffer.push_str(delta);
        self.complete.push_str(delta);

        if self.buffer.trim_end().ends_with(PAUSE_MARKER) {
            self.cut()
        } else {
            None
        }
    }

    /// Signal end of stream: flush whatever remains (empty chunks are
    /// suppressed, not emitted) and hand back the full concatenated reply
    /// for the conversation history.
    #[must_use]
    pub fn finish(mut self) -> (Option<SpeechChunk>, String) {
        let last = self.cut();
        (last, self.complete)
    }

    /// Close the current buffer into a chunk, trimming the trailing pause
    /// marker and surrounding whitespace. Suppressed (empty) chunks do not
    /// consume a sequence index.
    fn cut(&mut self) -> Option<SpeechChunk> {
        let raw = std::mem::take(&mut self.buffer);
        let text = raw.trim().trim_end_matches(PAUSE_MARKER).trim_end();
        if text.is_empty() {
            return None;
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Some(SpeechChunk::ordered(self.interaction, sequence, text))
    }
}
