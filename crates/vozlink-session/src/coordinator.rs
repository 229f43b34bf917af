//! Per-call session coordinator.
//!
//! Owns every piece of mutable session state — interaction counter,
//! generation token, conversation history, outstanding playback markers —
//! and wires the pipeline into a cycle:
//!
//! ```text
//!   transport events ─► accumulator ─► interaction ─► segmenter ─► dispatcher
//!                                                                      │
//!   transport ◄─────────────────────── delivery engine ◄───────────────┘
//! ```
//!
//! The coordinator is one cooperative task per call: a `select!` loop over
//! inbound transport events, recognizer events, internal pipeline events,
//! and the accumulator's debounce deadline. Nothing session-scoped is
//! touched from any other task except through the delivery engine's entry
//! points and the generation-token check.
//!
//! States are `Idle ⇄ Speaking`, read off the outstanding-marker set. While
//! `Speaking`, a sufficiently long candidate utterance is a barge-in: clear
//! the provider's playback queue, abort the delivery engine, invalidate the
//! generation token, and drop the markers — without waiting for the
//! interrupted interaction to finish.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use vozlink_core::{
    ChatMessage, MediaTransport, RecognitionEvent, RecognitionEvents, ReplyModel, SessionSettings,
    SpeechChunk, SpeechRecognizer, SpeechSynthesizer,
};

use crate::accumulator::{UtteranceAccumulator, UtteranceEvent};
use crate::delivery::{DeliveryEngine, PlaybackMark};
use crate::dispatcher::SynthesisDispatcher;
use crate::generation::{GenerationCounter, GenerationToken};
use crate::history::ConversationHistory;
use crate::segmenter::ReplySegmenter;

/// Typed inbound events, already decoded from the provider's wire format by
/// the transport adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// The media stream opened.
    Start { stream_id: String, call_id: String },

    /// Raw caller audio (base64 already decoded).
    Media { payload: Vec<u8> },

    /// The provider finished playing the audio behind this marker.
    MarkAcknowledged { name: String },

    /// The media stream ended; tear the session down.
    Stop,
}

/// Coarse session state, read off the outstanding-marker set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No markers outstanding; caller speech accumulates normally.
    Idle,
    /// At least one marker outstanding; new speech is a barge-in candidate.
    Speaking,
}

/// End-of-reply notification from a `run_interaction` task.
#[derive(Debug)]
struct ReplyOutcome {
    interaction: u64,
    token: GenerationToken,
    /// Full reply text on success; `None` when the stream failed and the
    /// fallback was spoken (history stays unmodified in that case).
    text: Option<String>,
}

/// Drives one phone call from `start` to `stop`.
pub struct SessionCoordinator {
    settings: SessionSettings,
    transport: Arc<dyn MediaTransport>,
    recognizer: Arc<dyn SpeechRecognizer>,
    model: Arc<dyn ReplyModel>,

    accumulator: UtteranceAccumulator,
    history: ConversationHistory,
    generation: GenerationCounter,
    delivery: DeliveryEngine,
    dispatcher: SynthesisDispatcher,

    inbound: mpsc::Receiver<InboundEvent>,
    recognition: RecognitionEvents,
    marks_rx: mpsc::UnboundedReceiver<PlaybackMark>,
    outcome_tx: mpsc::UnboundedSender<ReplyOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<ReplyOutcome>,

    outstanding_marks: HashSet<String>,
    interaction_count: u64,
    reply_in_progress: bool,
    /// Orthogonal overlay: the previous interaction was cut short by
    /// barge-in. Cleared when the next interaction starts.
    interrupted: bool,
    state: SessionState,
    recognizer_closed: bool,
    stream_id: Option<String>,
}

impl SessionCoordinator {
    /// Wire up a coordinator for one call.
    #[must_use]
    pub fn new(
        settings: SessionSettings,
        transport: Arc<dyn MediaTransport>,
        recognizer: Arc<dyn SpeechRecognizer>,
        model: Arc<dyn ReplyModel>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        inbound: mpsc::Receiver<InboundEvent>,
        recognition: RecognitionEvents,
    ) -> Self {
        let (marks_tx, marks_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        let generation = GenerationCounter::new();
        let delivery = DeliveryEngine::new(Arc::clone(&transport), marks_tx);
        let dispatcher = SynthesisDispatcher::new(
            synthesizer,
            generation.clone(),
            delivery.clone(),
            settings.min_synthesis_bytes,
        );

        Self {
            accumulator: UtteranceAccumulator::new(settings.clone()),
            history: ConversationHistory::new(&settings.system_prompt, settings.max_history_exchanges),
            generation,
            delivery,
            dispatcher,
            settings,
            transport,
            recognizer,
            model,
            inbound,
            recognition,
            marks_rx,
            outcome_tx,
            outcome_rx,
            outstanding_marks: HashSet::new(),
            interaction_count: 0,
            reply_in_progress: false,
            interrupted: false,
            state: SessionState::Idle,
            recognizer_closed: false,
            stream_id: None,
        }
    }

    /// Current coarse state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Whether playback markers are outstanding.
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        !self.outstanding_marks.is_empty()
    }

    /// Whether the previous interaction ended in a barge-in.
    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    /// Run the session until `stop` or the inbound channel closes.
    pub async fn run(mut self) {
        info!("Session coordinator started");

        loop {
            let flush_deadline = self.accumulator.flush_deadline();
            let flush_at =
                flush_deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(60));

            tokio::select! {
                inbound = self.inbound.recv() => match inbound {
                    Some(event) => {
                        if !self.handle_inbound(event).await {
                            break;
                        }
                    }
                    None => {
                        debug!("Inbound channel closed, ending session");
                        break;
                    }
                },
                recognition = self.recognition.recv(), if !self.recognizer_closed => {
                    match recognition {
                        Some(event) => self.handle_recognition(&event).await,
                        None => {
                            // Not fatal: the caller just experiences silence
                            // until the call ends.
                            warn!("Recognizer event stream closed");
                            self.recognizer_closed = true;
                        }
                    }
                },
                Some(mark) = self.marks_rx.recv() => self.handle_mark_sent(mark),
                Some(outcome) = self.outcome_rx.recv() => self.handle_reply_outcome(outcome),
                () = sleep_until(flush_at), if flush_deadline.is_some() => self.handle_flush().await,
            }
        }

        self.shutdown().await;
    }

    // ── Inbound transport events ───────────────────────────────────

    async fn handle_inbound(&mut self, event: InboundEvent) -> bool {
        match event {
            InboundEvent::Start { stream_id, call_id } => {
                info!(stream_id = %stream_id, call_id = %call_id, "Media stream started");
                self.stream_id = Some(stream_id);
                self.speak_greeting();
                true
            }
            InboundEvent::Media { payload } => {
                if let Err(e) = self.recognizer.send_audio(&payload).await {
                    warn!(error = %e, "Failed to forward caller audio to recognizer");
                }
                true
            }
            InboundEvent::MarkAcknowledged { name } => {
                self.outstanding_marks.remove(&name);
                self.refresh_state();
                true
            }
            InboundEvent::Stop => {
                info!(stream_id = ?self.stream_id, "Media stream stopped");
                false
            }
        }
    }

    /// Speak the one-shot greeting as an unordered chunk after a short
    /// settling delay.
    fn speak_greeting(&self) {
        let dispatcher = self.dispatcher.clone();
        let token = self.generation.current();
        let greeting = self.settings.greeting.clone();
        let delay = Duration::from_millis(self.settings.greeting_delay_ms);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            dispatcher.dispatch(SpeechChunk::unordered(0, greeting), token);
        });
    }

    // ── Recognition events ─────────────────────────────────────────

    async fn handle_recognition(&mut self, event: &RecognitionEvent) {
        match self.accumulator.on_recognition_event(event) {
            Some(UtteranceEvent::Candidate(text)) => {
                if self.is_speaking()
                    && text.trim().chars().count() > self.settings.barge_in_min_chars
                {
                    info!(len = text.len(), "Caller barge-in detected");
                    self.interrupt().await;
                }
            }
            Some(UtteranceEvent::Completed(text)) => self.on_utterance(text).await,
            None => {}
        }
    }

    async fn handle_flush(&mut self) {
        if let Some(text) = self.accumulator.flush() {
            self.on_utterance(text).await;
        }
    }

    async fn on_utterance(&mut self, text: String) {
        if self.is_speaking() {
            self.interrupt().await;
        }
        self.start_interaction(text);
    }

    /// Barge-in: stop playback now, discard stale work on arrival.
    async fn interrupt(&mut self) {
        if let Err(e) = self.transport.send_clear().await {
            warn!(error = %e, "Failed to send clear on interruption");
        }
        self.delivery.abort();
        self.generation.advance();
        self.outstanding_marks.clear();
        self.reply_in_progress = false;
        self.interrupted = true;
        self.refresh_state();
    }

    /// Start a fresh interaction for one completed utterance.
    fn start_interaction(&mut self, utterance: String) {
        let interaction = self.interaction_count;
        self.interaction_count += 1;
        info!(interaction, len = utterance.len(), "Caller utterance complete");

        self.history.push_user(utterance);
        self.history.trim();

        // Fresh token and fresh delivery sequence space; nothing carries
        // over from a previous (possibly interrupted) interaction.
        let token = self.generation.advance();
        self.delivery.reset();
        self.reply_in_progress = true;
        self.interrupted = false;

        tokio::spawn(run_interaction(
            Arc::clone(&self.model),
            self.history.messages(),
            self.dispatcher.clone(),
            interaction,
            token,
            self.settings.fallback_reply.clone(),
            self.outcome_tx.clone(),
        ));
        self.refresh_state();
    }

    // ── Internal pipeline events ───────────────────────────────────

    fn handle_mark_sent(&mut self, mark: PlaybackMark) {
        self.outstanding_marks.insert(mark.name);
        self.refresh_state();
    }

    fn handle_reply_outcome(&mut self, outcome: ReplyOutcome) {
        if !self.generation.is_current(outcome.token) {
            debug!(
                interaction = outcome.interaction,
                "Ignoring reply outcome from superseded interaction"
            );
            return;
        }

        self.reply_in_progress = false;
        if let Some(text) = outcome.text {
            self.history.push_assistant(text);
        }
        self.refresh_state();
    }

    // ── State bookkeeping ──────────────────────────────────────────

    /// Re-derive the coarse state. Idle requires both the marker set to be
    /// empty (all sent audio acknowledged or bulk-cleared) and the reply
    /// stream for the live interaction to have ended.
    fn refresh_state(&mut self) {
        let new_state = if self.is_speaking() || self.reply_in_progress {
            SessionState::Speaking
        } else {
            SessionState::Idle
        };
        if new_state != self.state {
            debug!(old = ?self.state, new = ?new_state, "Session state transition");
            self.state = new_state;
        }
    }

    async fn shutdown(mut self) {
        self.delivery.abort();
        self.outstanding_marks.clear();
        if let Err(e) = self.recognizer.finish().await {
            warn!(error = %e, "Recognizer close failed");
        }
        info!(interactions = self.interaction_count, "Session torn down");
    }
}

// ── Interaction runner ─────────────────────────────────────────────

/// Consume one reply stream: segment it into chunks, dispatch each for
/// synthesis, and report the outcome back to the coordinator.
///
/// On stream failure, exactly one unordered fallback chunk is spoken and the
/// interaction terminates; the conversation history is left unmodified
/// (`text: None`).
async fn run_interaction(
    model: Arc<dyn ReplyModel>,
    messages: Vec<ChatMessage>,
    dispatcher: SynthesisDispatcher,
    interaction: u64,
    token: GenerationToken,
    fallback_reply: String,
    outcome_tx: mpsc::UnboundedSender<ReplyOutcome>,
) {
    let mut stream = match model.stream_reply(&messages).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(interaction, error = %e, "Completion request failed");
            dispatcher.dispatch(
                SpeechChunk::unordered(interaction, fallback_reply.clone()),
                token,
            );
            let _ = outcome_tx.send(ReplyOutcome { interaction, token, text: None });
            return;
        }
    };

    let mut segmenter = ReplySegmenter::new(interaction);
    while let Some(delta) = stream.next().await {
        match delta {
            Ok(delta) => {
                if let Some(chunk) = segmenter.push_delta(&delta) {
                    dispatcher.dispatch(chunk, token);
                }
            }
            Err(e) => {
                warn!(interaction, error = %e, "Reply stream failed mid-generation");
                dispatcher.dispatch(
                    SpeechChunk::unordered(interaction, fallback_reply.clone()),
                    token,
                );
                let _ = outcome_tx.send(ReplyOutcome { interaction, token, text: None });
                return;
            }
        }
    }

    let (last, complete) = segmenter.finish();
    if let Some(chunk) = last {
        dispatcher.dispatch(chunk, token);
    }
    debug!(interaction, len = complete.len(), "Reply stream complete");
    let _ = outcome_tx.send(ReplyOutcome {
        interaction,
        token,
        text: Some(complete),
    });
}
