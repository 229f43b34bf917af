//! OpenAI-compatible streaming chat completions.
//!
//! Works against any `/chat/completions` endpoint that speaks the OpenAI
//! SSE dialect — the default base URL points at Perplexity. The response
//! body is read by a spawned task that splits the byte stream into SSE
//! lines and forwards content deltas over a channel, which is handed back
//! to the caller as a [`DeltaStream`].

use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use async_trait::async_trait;

use vozlink_core::{ChatMessage, DeltaStream, ModelError, ReplyModel};

/// Deltas buffered between the SSE reader task and the segmenter.
const DELTA_CHANNEL_CAPACITY: usize = 32;

/// Completion parameters.
///
/// `max_tokens` is deliberately small: replies are spoken, and anything
/// beyond a couple of sentences reads as the assistant rambling.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.perplexity.ai".to_string(),
            model: "sonar-pro".to_string(),
            temperature: 0.7,
            max_tokens: 150,
        }
    }
}

impl CompletionConfig {
    /// Read the configuration from the environment (`OPENAI_API_KEY`,
    /// optional `OPENAI_BASE_URL` / `OPENAI_MODEL`).
    pub fn from_env() -> Result<Self, ModelError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ModelError::Request("OPENAI_API_KEY is not set".into()))?;

        let mut config = Self {
            api_key,
            ..Self::default()
        };
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            config.model = model;
        }
        Ok(config)
    }
}

/// Streaming reply model over an OpenAI-compatible HTTP API.
pub struct OpenAiReplyModel {
    http: reqwest::Client,
    config: CompletionConfig,
}

impl OpenAiReplyModel {
    /// Create a model client with its own connection pool.
    #[must_use]
    pub fn new(config: CompletionConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ReplyModel for OpenAiReplyModel {
    async fn stream_reply(&self, messages: &[ChatMessage]) -> Result<DeltaStream, ModelError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "stream": true,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ModelError::Request(format!(
                "completion endpoint returned {status}: {detail}"
            )));
        }

        let (tx, rx) = mpsc::channel(DELTA_CHANNEL_CAPACITY);
        tokio::spawn(read_sse(response, tx));
        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

// ── SSE decoding ───────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum SseLine {
    /// A content fragment.
    Delta(String),
    /// The stream is complete.
    Done,
    /// Comment, empty line, role-only delta — nothing to forward.
    Skip,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

/// Split the raw byte stream into SSE lines and forward content deltas.
async fn read_sse(response: reqwest::Response, tx: mpsc::Sender<Result<String, ModelError>>) {
    let mut body = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(item) = body.next().await {
        let bytes = match item {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Completion stream broke mid-reply");
                let _ = tx.send(Err(ModelError::Stream(e.to_string()))).await;
                return;
            }
        };

        buffer.push_str(&String::from_utf8_lossy(&bytes));
        while let Some(newline) = buffer.find('\n') {
            let line: String = buffer.drain(..=newline).collect();
            match parse_sse_line(line.trim()) {
                SseLine::Delta(text) => {
                    if tx.send(Ok(text)).await.is_err() {
                        debug!("Delta receiver dropped, stopping SSE reader");
                        return;
                    }
                }
                SseLine::Done => return,
                SseLine::Skip => {}
            }
        }
    }
    // Server closed the body without [DONE]; treat it as a normal finish.
    debug!("Completion body ended without done marker");
}

fn parse_sse_line(line: &str) -> SseLine {
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();

    if data == "[DONE]" {
        return SseLine::Done;
    }

    let Ok(chunk) = serde_json::from_str::<StreamChunk>(data) else {
        warn!(line = %data, "Unparseable completion delta, skipping");
        return SseLine::Skip;
    };
    let Some(choice) = chunk.choices.first() else {
        return SseLine::Skip;
    };

    if let Some(content) = choice.delta.content.as_deref() {
        if !content.is_empty() {
            return SseLine::Delta(content.to_string());
        }
    }
    if choice.finish_reason.as_deref() == Some("stop") {
        return SseLine::Done;
    }
    SseLine::Skip
}
