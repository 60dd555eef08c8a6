//! ElevenLabs TTS engine for LiveHost
//!
//! Multilingual model by default so Indonesian replies come out natural.
//! The API key arrives per call; the core speech service rotates keys from
//! its pool between attempts.

#![warn(missing_docs)]
#![warn(clippy::all)]

use async_trait::async_trait;
use bytes::Bytes;
use livehost_core::synth::SpeechEngine;
use livehost_core::{LiveHostError, Result};
use reqwest::Client;
use serde::Serialize;
use std::sync::OnceLock;

/// ElevenLabs API base URL
const ELEVENLABS_API_BASE: &str = "https://api.elevenlabs.io/v1";

/// Hard text limit the API enforces
const MAX_TEXT_LENGTH: usize = 5000;

/// Shared HTTP client for connection pooling
static HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

fn get_http_client() -> Client {
    HTTP_CLIENT
        .get_or_init(|| {
            Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("Failed to create HTTP client")
        })
        .clone()
}

/// ElevenLabs model ID
#[derive(Debug, Clone)]
pub enum ElevenLabsModel {
    /// Multilingual v2 - best quality, handles Indonesian
    MultilingualV2,
    /// Turbo v2.5 - fastest, English-leaning
    TurboV2_5,
    /// Custom model ID
    Custom(String),
}

impl ElevenLabsModel {
    /// Get model ID string
    pub fn as_str(&self) -> &str {
        match self {
            Self::MultilingualV2 => "eleven_multilingual_v2",
            Self::TurboV2_5 => "eleven_turbo_v2_5",
            Self::Custom(id) => id,
        }
    }
}

impl Default for ElevenLabsModel {
    fn default() -> Self {
        Self::MultilingualV2
    }
}

/// ElevenLabs voice settings
#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
    style: f32,
    use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
            style: 0.0,
            use_speaker_boost: true,
        }
    }
}

/// ElevenLabs TTS request body
#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

/// ElevenLabs TTS engine
pub struct ElevenLabsEngine {
    client: Client,
    base_url: String,
    model: ElevenLabsModel,
    output_format: &'static str,
}

impl ElevenLabsEngine {
    /// Create an engine with the default multilingual model
    pub fn new() -> Self {
        Self {
            client: get_http_client(),
            base_url: ELEVENLABS_API_BASE.to_string(),
            model: ElevenLabsModel::default(),
            output_format: "mp3_44100_128",
        }
    }

    /// Use a specific model
    pub fn with_model(mut self, model: ElevenLabsModel) -> Self {
        self.model = model;
        self
    }

    /// Point at a custom base URL (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Default for ElevenLabsEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechEngine for ElevenLabsEngine {
    fn name(&self) -> &str {
        "elevenlabs"
    }

    async fn synthesize(&self, text: &str, voice_id: &str, api_key: &str) -> Result<Bytes> {
        if text.len() > MAX_TEXT_LENGTH {
            return Err(LiveHostError::provider(format!(
                "Text exceeds ElevenLabs limit: {} > {}",
                text.len(),
                MAX_TEXT_LENGTH
            )));
        }

        let request = TtsRequest {
            text,
            model_id: self.model.as_str(),
            voice_settings: VoiceSettings::default(),
        };

        tracing::debug!(
            "ElevenLabs TTS request: model={}, voice={}, text_len={}",
            self.model.as_str(),
            voice_id,
            text.len()
        );

        let url = format!(
            "{}/text-to-speech/{}?output_format={}",
            self.base_url, voice_id, self.output_format
        );

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            // 401/429 drive key-pool rotation upstream; other statuses keep
            // the body so quota keywords in it still classify correctly
            return Err(match status.as_u16() {
                401 => LiveHostError::auth(error_text),
                429 => LiveHostError::rate_limit(error_text),
                _ => LiveHostError::provider(format!(
                    "ElevenLabs TTS error ({}): {}",
                    status, error_text
                )),
            });
        }

        let audio = response.bytes().await?;
        tracing::debug!("ElevenLabs TTS response: {} bytes", audio.len());
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_strings() {
        assert_eq!(
            ElevenLabsModel::MultilingualV2.as_str(),
            "eleven_multilingual_v2"
        );
        assert_eq!(ElevenLabsModel::TurboV2_5.as_str(), "eleven_turbo_v2_5");
        assert_eq!(ElevenLabsModel::Custom("x".into()).as_str(), "x");
    }

    #[test]
    fn test_default_voice_settings() {
        let settings = VoiceSettings::default();
        assert_eq!(settings.stability, 0.5);
        assert_eq!(settings.similarity_boost, 0.75);
        assert!(settings.use_speaker_boost);
    }

    #[test]
    fn test_request_body_shape() {
        let request = TtsRequest {
            text: "halo kak",
            model_id: "eleven_multilingual_v2",
            voice_settings: VoiceSettings::default(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["text"], "halo kak");
        assert_eq!(json["model_id"], "eleven_multilingual_v2");
        assert_eq!(json["voice_settings"]["stability"], 0.5);
    }

    #[tokio::test]
    async fn test_oversized_text_rejected_before_network() {
        let engine = ElevenLabsEngine::new().with_base_url("http://127.0.0.1:1");
        let text = "a".repeat(MAX_TEXT_LENGTH + 1);
        let err = engine.synthesize(&text, "voice", "key").await.unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }
}
