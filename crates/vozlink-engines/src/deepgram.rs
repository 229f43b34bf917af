//! Live speech recognition over Deepgram's streaming WebSocket.
//!
//! One connection per call, kept open for the call's whole lifetime: caller
//! audio goes out as binary frames in the provider's codec (no transcoding),
//! transcript JSON comes back and is decoded into [`RecognitionEvent`]s on a
//! bounded channel. Writer and reader run as separate tasks so a slow read
//! never backs up audio forwarding.

use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tracing::{debug, info, warn};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use url::Url;

use vozlink_core::{RecognitionEvent, RecognitionEvents, RecognizerError, SpeechRecognizer};

/// Events buffered between the reader task and the session coordinator.
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Live transcription parameters.
///
/// Defaults match phone-call audio: µ-law at 8 kHz, interim results for
/// barge-in detection, and the engine's own endpointing as the
/// end-of-speech signal.
#[derive(Debug, Clone)]
pub struct DeepgramConfig {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    pub language: String,
    pub encoding: String,
    pub sample_rate: u32,
    pub punctuate: bool,
    pub interim_results: bool,
    pub endpointing_ms: u32,
    pub utterance_end_ms: u32,
}

impl Default for DeepgramConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: "wss://api.deepgram.com/v1/listen".to_string(),
            model: "nova-2".to_string(),
            language: "es".to_string(),
            encoding: "mulaw".to_string(),
            sample_rate: 8000,
            punctuate: true,
            interim_results: true,
            endpointing_ms: 200,
            utterance_end_ms: 1000,
        }
    }
}

impl DeepgramConfig {
    /// Read the configuration from the environment (`DEEPGRAM_API_KEY`,
    /// optional `DEEPGRAM_LANGUAGE`).
    pub fn from_env() -> Result<Self, RecognizerError> {
        let api_key = std::env::var("DEEPGRAM_API_KEY")
            .map_err(|_| RecognizerError::Connect("DEEPGRAM_API_KEY is not set".into()))?;

        let mut config = Self {
            api_key,
            ..Self::default()
        };
        if let Ok(language) = std::env::var("DEEPGRAM_LANGUAGE") {
            config.language = language;
        }
        Ok(config)
    }

    /// Build the listen URL with the transcription parameters as query
    /// string.
    fn request_url(&self) -> Result<Url, RecognizerError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| RecognizerError::Connect(format!("bad endpoint: {e}")))?;
        url.query_pairs_mut()
            .append_pair("model", &self.model)
            .append_pair("language", &self.language)
            .append_pair("encoding", &self.encoding)
            .append_pair("sample_rate", &self.sample_rate.to_string())
            .append_pair("punctuate", &self.punctuate.to_string())
            .append_pair("interim_results", &self.interim_results.to_string())
            .append_pair("endpointing", &self.endpointing_ms.to_string())
            .append_pair("utterance_end_ms", &self.utterance_end_ms.to_string());
        Ok(url)
    }
}

/// A live recognition session.
pub struct DeepgramRecognizer {
    outbound: mpsc::Sender<Message>,
}

impl DeepgramRecognizer {
    /// Open the streaming connection and hand back the recognizer plus the
    /// event channel the coordinator consumes.
    pub async fn connect(
        config: &DeepgramConfig,
    ) -> Result<(Self, RecognitionEvents), RecognizerError> {
        let url = config.request_url()?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| RecognizerError::Connect(e.to_string()))?;
        let auth = HeaderValue::from_str(&format!("Token {}", config.api_key))
            .map_err(|e| RecognizerError::Connect(format!("bad api key: {e}")))?;
        request.headers_mut().insert("Authorization", auth);

        let (socket, _response) = connect_async(request)
            .await
            .map_err(|e| RecognizerError::Connect(e.to_string()))?;
        info!(model = %config.model, language = %config.language, "Recognizer connected");

        let (mut sink, mut stream) = socket.split();

        // Writer: drains outbound audio/control frames.
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if let Err(e) = sink.send(message).await {
                    warn!(error = %e, "Recognizer send failed, stopping writer");
                    break;
                }
            }
            debug!("Recognizer writer task exiting");
        });

        // Reader: decodes transcript payloads into recognition events.
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if let Some(event) = parse_transcript(&text) {
                            if events_tx.send(event).await.is_err() {
                                debug!("Recognition event receiver dropped, stopping reader");
                                break;
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!("Recognizer closed the connection");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        // Not fatal to the session: the caller just hears
                        // silence until the call ends.
                        warn!(error = %e, "Recognizer read error");
                        break;
                    }
                }
            }
            debug!("Recognizer reader task exiting");
        });

        Ok((Self { outbound: outbound_tx }, events_rx))
    }
}

#[async_trait]
impl SpeechRecognizer for DeepgramRecognizer {
    async fn send_audio(&self, audio: &[u8]) -> Result<(), RecognizerError> {
        self.outbound
            .send(Message::Binary(audio.to_vec()))
            .await
            .map_err(|_| RecognizerError::Transport("recognizer connection closed".into()))
    }

    async fn finish(&self) -> Result<(), RecognizerError> {
        self.outbound
            .send(Message::Text(r#"{"type":"CloseStream"}"#.to_string()))
            .await
            .map_err(|_| RecognizerError::Transport("recognizer connection closed".into()))
    }
}

// ── Wire decoding ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TranscriptPayload {
    #[serde(rename = "type")]
    kind: Option<String>,
    channel: Option<TranscriptChannel>,
    #[serde(default)]
    is_final: bool,
    #[serde(default)]
    speech_final: bool,
}

#[derive(Debug, Deserialize)]
struct TranscriptChannel {
    #[serde(default)]
    alternatives: Vec<TranscriptAlternative>,
}

#[derive(Debug, Deserialize)]
struct TranscriptAlternative {
    #[serde(default)]
    transcript: String,
}

/// Decode one text frame into a recognition event.
///
/// Non-transcript frames (metadata, utterance-end markers) and payloads with
/// no text return `None` — the accumulator ignores empties anyway, so we
/// drop them here and keep the channel quiet.
fn parse_transcript(text: &str) -> Option<RecognitionEvent> {
    let payload: TranscriptPayload = serde_json::from_str(text).ok()?;
    if payload.kind.as_deref() != Some("Results") {
        return None;
    }

    let transcript = payload
        .channel?
        .alternatives
        .first()
        .map(|alt| alt.transcript.trim().to_string())?;
    if transcript.is_empty() {
        return None;
    }

    Some(RecognitionEvent {
        text: transcript,
        is_final: payload.is_final,
        is_speech_final: payload.speech_final,
    })
}
