//! Axum server bootstrap — the composition root.
//!
//! This module is the only place where infrastructure is wired together:
//! engine configuration comes from the environment, the shared model and
//! synthesizer clients are constructed once, and the recognizer is opened
//! per call inside the WebSocket handler.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use vozlink_core::{ReplyModel, SessionSettings, SpeechSynthesizer};
use vozlink_engines::{
    CompletionConfig, DeepgramConfig, ElevenLabsSynthesizer, OpenAiReplyModel, SynthesisConfig,
};

use crate::routes::build_router;
use crate::state::AppState;

/// Application context for the Axum adapter.
pub struct AxumContext {
    /// Per-call pipeline settings.
    pub settings: SessionSettings,
    /// Public hostname the provider connects back to (`wss://{host}/connection`).
    pub public_host: String,
    /// Recognizer connection parameters (one connection per call).
    pub recognizer_config: DeepgramConfig,
    /// Shared streaming completion client.
    pub model: Arc<dyn ReplyModel>,
    /// Shared synthesis client.
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl AxumContext {
    /// Assemble a context from explicit parts (used by tests).
    #[must_use]
    pub fn new(
        settings: SessionSettings,
        public_host: String,
        recognizer_config: DeepgramConfig,
        model: Arc<dyn ReplyModel>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            settings,
            public_host,
            recognizer_config,
            model,
            synthesizer,
        }
    }

    /// Build the context from environment variables.
    ///
    /// Required: `SERVER` (public hostname), `DEEPGRAM_API_KEY`,
    /// `OPENAI_API_KEY`, `ELEVENLABS_API_KEY`. Optional overrides:
    /// `SYSTEM_PROMPT`, `GREETING`, and the per-engine variables documented
    /// on each config's `from_env`.
    pub fn from_env() -> Result<Self> {
        let public_host = std::env::var("SERVER")
            .context("SERVER (public hostname) is not set")?;

        let mut settings = SessionSettings::default();
        if let Ok(prompt) = std::env::var("SYSTEM_PROMPT") {
            settings.system_prompt = prompt;
        }
        if let Ok(greeting) = std::env::var("GREETING") {
            settings.greeting = greeting;
        }
        settings.validate().context("invalid session settings")?;

        let recognizer_config =
            DeepgramConfig::from_env().context("recognizer configuration")?;
        let completion_config =
            CompletionConfig::from_env().context("completion configuration")?;
        let synthesis_config =
            SynthesisConfig::from_env().context("synthesis configuration")?;

        Ok(Self {
            settings,
            public_host,
            recognizer_config,
            model: Arc::new(OpenAiReplyModel::new(completion_config)),
            synthesizer: Arc::new(ElevenLabsSynthesizer::new(synthesis_config)),
        })
    }
}

/// Bind and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "vozlink server listening");
    axum::serve(listener, router).await.context("server error")
}
