//! Text-to-speech via a remote synthesis endpoint.

use crate::config::Config;
use crate::upstream::{describe_failure, endpoint};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde_json::json;
use thiserror::Error;

/// MIME type of every synthesized artifact.
pub const AUDIO_MIME_TYPE: &str = "audio/mpeg";

/// Errors raised by speech synthesizers.
#[derive(Debug, Error)]
pub enum SpeechClientError {
    /// The provider failed to produce audio; carries the upstream message.
    #[error("{0}")]
    SynthesisFailed(String),
}

/// Encoded audio produced by a synthesizer, waiting to be delivered.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    /// MP3-encoded audio.
    pub bytes: Bytes,
    /// Filename offered to the client in the `Content-Disposition` header.
    pub suggested_filename: &'static str,
}

impl AudioArtifact {
    /// Wrap synthesized bytes with the filename the client should save them under.
    pub fn new(bytes: Bytes, suggested_filename: &'static str) -> Self {
        Self {
            bytes,
            suggested_filename,
        }
    }

    /// MIME type of the artifact.
    pub const fn mime_type(&self) -> &'static str {
        AUDIO_MIME_TYPE
    }
}

/// Interface implemented by speech synthesis providers.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Convert `text` into MP3 bytes.
    async fn synthesize(&self, text: &str) -> Result<Bytes, SpeechClientError>;
}

/// Audio-speech client for OpenAI-compatible providers.
pub struct OpenAiSpeechClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    voice: String,
}

impl OpenAiSpeechClient {
    /// Create a client using the shared HTTP transport and the configured model and voice.
    pub fn new(http: Client, config: &Config) -> Self {
        Self {
            http,
            base_url: config.openai_base_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.tts_model.clone(),
            voice: config.tts_voice.clone(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeechClient {
    async fn synthesize(&self, text: &str) -> Result<Bytes, SpeechClientError> {
        let payload = json!({
            "model": self.model,
            "voice": self.voice,
            "input": text,
            "response_format": "mp3",
        });
        tracing::debug!(
            model = %self.model,
            voice = %self.voice,
            input_chars = text.len(),
            "Requesting speech synthesis"
        );

        let response = self
            .http
            .post(endpoint(&self.base_url, "audio/speech"))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| SpeechClientError::SynthesisFailed(error.to_string()))?;

        if !response.status().is_success() {
            return Err(SpeechClientError::SynthesisFailed(
                describe_failure(response).await,
            ));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|error| SpeechClientError::SynthesisFailed(error.to_string()))?;
        if audio.is_empty() {
            return Err(SpeechClientError::SynthesisFailed(
                "provider returned no audio".into(),
            ));
        }
        tracing::debug!(bytes = audio.len(), "Speech synthesized");
        Ok(audio)
    }
}
