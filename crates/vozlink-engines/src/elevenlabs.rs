//! HTTP speech synthesis via the ElevenLabs API.
//!
//! One POST per chunk; the response body is the audio, requested directly
//! in the telephony codec (`ulaw_8000`) so the delivery path stays byte
//! pass-through end to end.

use async_trait::async_trait;
use tracing::debug;

use vozlink_core::{SpeechSynthesizer, SynthesisError};

/// Synthesis parameters.
#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    pub api_key: String,
    pub base_url: String,
    pub voice_id: String,
    pub model_id: String,
    /// Audio format requested from the engine; must match the transport
    /// codec since audio bytes pass through untouched.
    pub output_format: String,
    pub stability: f32,
    pub similarity_boost: f32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.elevenlabs.io".to_string(),
            voice_id: "EXAVITQu4vr4xnSDxMaL".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            output_format: "ulaw_8000".to_string(),
            stability: 0.35,
            similarity_boost: 0.92,
        }
    }
}

impl SynthesisConfig {
    /// Read the configuration from the environment (`ELEVENLABS_API_KEY`,
    /// optional `ELEVENLABS_VOICE_ID`).
    pub fn from_env() -> Result<Self, SynthesisError> {
        let api_key = std::env::var("ELEVENLABS_API_KEY")
            .map_err(|_| SynthesisError::Engine("ELEVENLABS_API_KEY is not set".into()))?;

        let mut config = Self {
            api_key,
            ..Self::default()
        };
        if let Ok(voice_id) = std::env::var("ELEVENLABS_VOICE_ID") {
            config.voice_id = voice_id;
        }
        Ok(config)
    }
}

/// Speech synthesizer backed by the ElevenLabs HTTP API.
pub struct ElevenLabsSynthesizer {
    http: reqwest::Client,
    config: SynthesisConfig,
}

impl ElevenLabsSynthesizer {
    /// Create a synthesizer client with its own connection pool.
    #[must_use]
    pub fn new(config: SynthesisConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn request_url(&self) -> String {
        format!(
            "{}/v1/text-to-speech/{}?output_format={}",
            self.config.base_url, self.config.voice_id, self.config.output_format
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        let body = serde_json::json!({
            "text": text,
            "model_id": self.config.model_id,
            "voice_settings": {
                "stability": self.config.stability,
                "similarity_boost": self.config.similarity_boost,
            },
        });

        let response = self
            .http
            .post(self.request_url())
            .header("xi-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SynthesisError::Engine(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Engine(format!(
                "synthesis endpoint returned {status}: {detail}"
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Engine(e.to_string()))?;
        debug!(bytes = audio.len(), chars = text.len(), "Synthesized chunk");
        Ok(audio.to_vec())
    }
}
