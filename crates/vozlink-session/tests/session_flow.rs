//! Integration tests for the `SessionCoordinator` pipeline.
//!
//! These drive a full session through mock ports — no network, no real
//! engines, no wall-clock waits (the tokio clock is paused and auto-advances
//! past synthesis delays). What is asserted:
//!
//! - the greeting plays as an unordered chunk after `start`
//! - a completed utterance produces reply audio strictly in chunk order,
//!   even when synthesis completions arrive reversed
//! - barge-in sends `clear`, empties the pipeline, and late synthesis
//!   results for the interrupted interaction never reach the transport
//! - a mid-stream model failure speaks the fallback and leaves the
//!   conversation history unmodified
//! - caller audio is forwarded to the recognizer, and `stop` closes it

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use vozlink_core::{
    ChatMessage, ChatRole, DeltaStream, MediaTransport, ModelError, RecognitionEvent,
    RecognizerError, SessionSettings, SpeechRecognizer, SpeechSynthesizer, SynthesisError,
    TransportError,
};
use vozlink_session::{InboundEvent, SessionCoordinator};

// ── Mock ports ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Frame {
    Media(Vec<u8>),
    Mark(String),
    Clear,
}

/// Transport that records every outbound frame.
struct RecordingTransport {
    frames: mpsc::UnboundedSender<Frame>,
}

impl RecordingTransport {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { frames: tx }), rx)
    }
}

#[async_trait]
impl MediaTransport for RecordingTransport {
    async fn send_media(&self, payload: &[u8]) -> Result<(), TransportError> {
        let _ = self.frames.send(Frame::Media(payload.to_vec()));
        Ok(())
    }
    async fn send_mark(&self, name: &str) -> Result<(), TransportError> {
        let _ = self.frames.send(Frame::Mark(name.to_string()));
        Ok(())
    }
    async fn send_clear(&self) -> Result<(), TransportError> {
        let _ = self.frames.send(Frame::Clear);
        Ok(())
    }
    fn is_open(&self) -> bool {
        true
    }
}

/// Recognizer that records forwarded audio and whether it was closed.
struct RecordingRecognizer {
    audio: Mutex<Vec<Vec<u8>>>,
    finished: Mutex<bool>,
}

impl RecordingRecognizer {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            audio: Mutex::new(Vec::new()),
            finished: Mutex::new(false),
        })
    }
}

#[async_trait]
impl SpeechRecognizer for RecordingRecognizer {
    async fn send_audio(&self, audio: &[u8]) -> Result<(), RecognizerError> {
        self.audio.lock().unwrap().push(audio.to_vec());
        Ok(())
    }
    async fn finish(&self) -> Result<(), RecognizerError> {
        *self.finished.lock().unwrap() = true;
        Ok(())
    }
}

/// Model that replays scripted delta sequences, one script per call, and
/// records the history window it was handed.
struct ScriptedModel {
    scripts: Mutex<Vec<Vec<Result<String, ModelError>>>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    fn new(scripts: Vec<Vec<Result<String, ModelError>>>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn call_messages(&self, call: usize) -> Vec<ChatMessage> {
        self.calls.lock().unwrap()[call].clone()
    }
}

#[async_trait]
impl vozlink_core::ReplyModel for ScriptedModel {
    async fn stream_reply(&self, messages: &[ChatMessage]) -> Result<DeltaStream, ModelError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        let mut scripts = self.scripts.lock().unwrap();
        if scripts.is_empty() {
            return Err(ModelError::Request("no script left".into()));
        }
        let script = scripts.remove(0);
        Ok(Box::pin(futures_util::stream::iter(script)))
    }
}

/// Synthesizer that echoes text back as audio after a per-text delay, so
/// tests can force completions to arrive out of order.
struct DelayedSynth {
    delays: HashMap<String, u64>,
}

impl DelayedSynth {
    fn instant() -> Arc<Self> {
        Arc::new(Self { delays: HashMap::new() })
    }

    fn with_delays(delays: &[(&str, u64)]) -> Arc<Self> {
        Arc::new(Self {
            delays: delays
                .iter()
                .map(|(text, ms)| ((*text).to_string(), *ms))
                .collect(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for DelayedSynth {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        let delay = self.delays.get(text).copied().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(text.as_bytes().to_vec())
    }
}

// ── Harness ────────────────────────────────────────────────────────

struct Session {
    inbound: mpsc::Sender<InboundEvent>,
    recognition: mpsc::Sender<RecognitionEvent>,
    frames: mpsc::UnboundedReceiver<Frame>,
    handle: tokio::task::JoinHandle<()>,
}

fn test_settings() -> SessionSettings {
    SessionSettings {
        greeting_delay_ms: 0,
        min_synthesis_bytes: 1,
        ..SessionSettings::default()
    }
}

fn spawn_session(
    model: Arc<ScriptedModel>,
    synth: Arc<DelayedSynth>,
    recognizer: Arc<RecordingRecognizer>,
) -> Session {
    let (transport, frames) = RecordingTransport::new();
    let (inbound_tx, inbound_rx) = mpsc::channel(32);
    let (recog_tx, recog_rx) = mpsc::channel(32);

    let coordinator = SessionCoordinator::new(
        test_settings(),
        transport,
        recognizer,
        model,
        synth,
        inbound_rx,
        recog_rx,
    );
    let handle = tokio::spawn(coordinator.run());

    Session {
        inbound: inbound_tx,
        recognition: recog_tx,
        frames,
        handle,
    }
}

async fn next_frame(session: &mut Session) -> Frame {
    tokio::time::timeout(Duration::from_secs(10), session.frames.recv())
        .await
        .expect("timed out waiting for transport frame")
        .expect("transport frame channel closed")
}

async fn settle() {
    // With the clock paused this yields until every ready task has run.
    tokio::time::sleep(Duration::from_millis(1)).await;
}

// ── Tests ──────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn greeting_plays_after_start() {
    let model = ScriptedModel::new(vec![]);
    let mut session = spawn_session(model, DelayedSynth::instant(), RecordingRecognizer::new());

    session
        .inbound
        .send(InboundEvent::Start {
            stream_id: "MZ123".into(),
            call_id: "CA123".into(),
        })
        .await
        .unwrap();

    let greeting = SessionSettings::default().greeting;
    assert_eq!(next_frame(&mut session).await, Frame::Media(greeting.into_bytes()));
    assert!(matches!(next_frame(&mut session).await, Frame::Mark(_)));
}

#[tokio::test(start_paused = true)]
async fn reply_audio_is_delivered_in_chunk_order_despite_slow_synthesis() {
    let model = ScriptedModel::new(vec![vec![
        Ok("Hola".to_string()),
        Ok(" mundo•".to_string()),
        Ok(" ¿cómo estás?".to_string()),
    ]]);
    // First chunk synthesizes slower than the second: completions arrive
    // reversed, delivery must not.
    let synth = DelayedSynth::with_delays(&[("Hola mundo", 50), ("¿cómo estás?", 10)]);
    let mut session = spawn_session(model.clone(), synth, RecordingRecognizer::new());

    session
        .recognition
        .send(RecognitionEvent::speech_final("buenos días señor"))
        .await
        .unwrap();

    assert_eq!(
        next_frame(&mut session).await,
        Frame::Media(b"Hola mundo".to_vec())
    );
    assert!(matches!(next_frame(&mut session).await, Frame::Mark(_)));
    assert_eq!(
        next_frame(&mut session).await,
        Frame::Media("¿cómo estás?".as_bytes().to_vec())
    );
    assert!(matches!(next_frame(&mut session).await, Frame::Mark(_)));

    // The model saw the system prompt plus the caller's utterance.
    let messages = model.call_messages(0);
    assert_eq!(messages[0].role, ChatRole::System);
    assert_eq!(messages[1].role, ChatRole::User);
    assert_eq!(messages[1].content, "buenos días señor");
}

#[tokio::test(start_paused = true)]
async fn barge_in_clears_playback_and_discards_stale_synthesis() {
    let model = ScriptedModel::new(vec![
        vec![Ok("Primera parte•".to_string()), Ok(" y segunda parte•".to_string())],
        vec![Ok("Nueva respuesta•".to_string())],
    ]);
    // Chunk 0 is instant; chunk 1 completes long after the barge-in.
    let synth = DelayedSynth::with_delays(&[("y segunda parte", 500)]);
    let mut session = spawn_session(model, synth, RecordingRecognizer::new());

    session
        .recognition
        .send(RecognitionEvent::speech_final("buenas tardes señora"))
        .await
        .unwrap();

    assert_eq!(
        next_frame(&mut session).await,
        Frame::Media(b"Primera parte".to_vec())
    );
    assert!(matches!(next_frame(&mut session).await, Frame::Mark(_)));
    settle().await;

    // Caller speaks over the assistant while its marker is outstanding.
    session
        .recognition
        .send(RecognitionEvent::interim("espera un momento"))
        .await
        .unwrap();

    assert_eq!(next_frame(&mut session).await, Frame::Clear);

    // The interim seed flushes after the debounce and becomes the next
    // interaction; the interrupted chunk 1 finishes synthesizing in the
    // meantime and must never be heard.
    assert_eq!(
        next_frame(&mut session).await,
        Frame::Media(b"Nueva respuesta".to_vec())
    );
    assert!(matches!(next_frame(&mut session).await, Frame::Mark(_)));

    // Advance well past the interrupted chunk's synthesis delay: its result
    // lands with a stale token and must produce no media frame.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(
        session.frames.try_recv().is_err(),
        "stale synthesis for the interrupted interaction must not be delivered"
    );
}

#[tokio::test(start_paused = true)]
async fn model_failure_speaks_fallback_and_leaves_history_unmodified() {
    let model = ScriptedModel::new(vec![
        vec![
            Ok("Hola".to_string()),
            Err(ModelError::Stream("connection reset".into())),
        ],
        vec![Ok("Segunda•".to_string())],
    ]);
    let mut session = spawn_session(
        model.clone(),
        DelayedSynth::instant(),
        RecordingRecognizer::new(),
    );

    session
        .recognition
        .send(RecognitionEvent::speech_final("primera pregunta"))
        .await
        .unwrap();

    let fallback = SessionSettings::default().fallback_reply;
    assert_eq!(
        next_frame(&mut session).await,
        Frame::Media(fallback.into_bytes())
    );
    let Frame::Mark(mark_name) = next_frame(&mut session).await else {
        panic!("expected mark after fallback media");
    };

    // The provider finishes playing the fallback; the caller asks again.
    // The new history window must not contain any assistant turn from the
    // failed reply.
    session
        .inbound
        .send(InboundEvent::MarkAcknowledged { name: mark_name })
        .await
        .unwrap();
    settle().await;

    session
        .recognition
        .send(RecognitionEvent::speech_final("segunda pregunta"))
        .await
        .unwrap();
    assert_eq!(next_frame(&mut session).await, Frame::Media(b"Segunda".to_vec()));

    let messages = model.call_messages(1);
    assert!(
        messages.iter().all(|m| m.role != ChatRole::Assistant),
        "failed reply must not enter history: {messages:?}"
    );
    assert_eq!(messages.last().unwrap().content, "segunda pregunta");
}

#[tokio::test(start_paused = true)]
async fn caller_audio_reaches_recognizer_and_stop_closes_it() {
    let recognizer = RecordingRecognizer::new();
    let model = ScriptedModel::new(vec![]);
    let session = spawn_session(model, DelayedSynth::instant(), Arc::clone(&recognizer));

    session
        .inbound
        .send(InboundEvent::Media {
            payload: vec![1, 2, 3, 4],
        })
        .await
        .unwrap();
    settle().await;
    assert_eq!(recognizer.audio.lock().unwrap().as_slice(), [vec![1, 2, 3, 4]]);

    session.inbound.send(InboundEvent::Stop).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), session.handle)
        .await
        .expect("coordinator must stop on Stop")
        .unwrap();
    assert!(*recognizer.finished.lock().unwrap());
}

#[tokio::test(start_paused = true)]
async fn short_interim_while_idle_flushes_into_an_interaction() {
    let model = ScriptedModel::new(vec![vec![Ok("Claro•".to_string())]]);
    let mut session = spawn_session(model.clone(), DelayedSynth::instant(), RecordingRecognizer::new());

    session
        .recognition
        .send(RecognitionEvent::interim("hola"))
        .await
        .unwrap();

    // Debounce expiry turns the lone interim into the utterance.
    assert_eq!(next_frame(&mut session).await, Frame::Media(b"Claro".to_vec()));
    let messages = model.call_messages(0);
    assert_eq!(messages[1].content, "hola");
}
