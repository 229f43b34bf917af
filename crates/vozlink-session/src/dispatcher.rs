//! Synthesis dispatch — text chunks in, token-checked audio out.
//!
//! Each chunk is synthesized in its own task so slow engine calls never
//! stall the reply stream. The generation token is compared only when the
//! result lands: a mismatch means the interaction was interrupted or
//! superseded, and the audio is silently discarded. Per-chunk failures
//! (engine error, implausibly short audio) are logged and dropped without
//! aborting the interaction — the remaining chunks still get their chance.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use vozlink_core::{SpeechChunk, SpeechSynthesizer};

use crate::delivery::DeliveryEngine;
use crate::generation::{GenerationCounter, GenerationToken};
use crate::normalize::normalize_for_speech;

/// Fans chunks out to the synthesis engine and into the delivery engine.
#[derive(Clone)]
pub struct SynthesisDispatcher {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    generation: GenerationCounter,
    delivery: DeliveryEngine,
    min_audio_bytes: usize,
}

impl SynthesisDispatcher {
    /// Create a dispatcher bound to one session's delivery engine and
    /// generation counter.
    #[must_use]
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        generation: GenerationCounter,
        delivery: DeliveryEngine,
        min_audio_bytes: usize,
    ) -> Self {
        Self {
            synthesizer,
            generation,
            delivery,
            min_audio_bytes,
        }
    }

    /// Synthesize `chunk` under `token` in a spawned task.
    ///
    /// The handle is returned for tests; production callers fire and forget.
    pub fn dispatch(&self, chunk: SpeechChunk, token: GenerationToken) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let text = normalize_for_speech(&chunk.text);
            if text.is_empty() {
                return;
            }

            match this.synthesizer.synthesize(&text).await {
                Ok(audio) if audio.len() >= this.min_audio_bytes => {
                    if this.generation.is_current(token) {
                        this.delivery.submit(chunk.sequence, audio);
                    } else {
                        debug!(
                            interaction = chunk.interaction,
                            sequence = ?chunk.sequence,
                            "Discarding synthesis result for superseded generation"
                        );
                    }
                }
                Ok(audio) => {
                    warn!(
                        bytes = audio.len(),
                        min = this.min_audio_bytes,
                        sequence = ?chunk.sequence,
                        "Synthesis produced too little audio, dropping chunk"
                    );
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        sequence = ?chunk.sequence,
                        "Synthesis failed, dropping chunk"
                    );
                }
            }
        })
    }
}
