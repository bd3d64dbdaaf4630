use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::upstream::DEFAULT_BASE_URL;

const DEFAULT_TTS_VOICE: &str = "alloy";
const DEFAULT_TTS_MODEL: &str = "tts-1";
const DEFAULT_SUMMARY_MODEL: &str = "gpt-4o-mini";
const DEFAULT_SUMMARY_WORDS: usize = 200;
const DEFAULT_TTL_MINUTES: u64 = 8;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
const TMP_SUBFOLDER: &str = "readformecuh";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// How synthesized audio is handed back to the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageMode {
    /// Keep the audio in memory and stream it inline.
    Stream,
    /// Persist the audio to a temp file that is deleted after the TTL.
    TempFile,
}

impl std::str::FromStr for StorageMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stream" => Ok(Self::Stream),
            "tempfile" => Ok(Self::TempFile),
            _ => Err(()),
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream => f.write_str("stream"),
            Self::TempFile => f.write_str("tempfile"),
        }
    }
}

/// Runtime configuration for the Read For Me server.
///
/// Built once at startup and shared behind an `Arc`; nothing reads the environment after that.
#[derive(Clone)]
pub struct Config {
    /// Bearer token for the upstream provider.
    pub openai_api_key: String,
    /// Base URL of the OpenAI-compatible API.
    pub openai_base_url: String,
    /// Voice identifier passed to the speech endpoint.
    pub tts_voice: String,
    /// Speech model identifier.
    pub tts_model: String,
    /// Chat model used for summaries.
    pub summary_model: String,
    /// Target summary length in words.
    pub summary_words: usize,
    /// Response strategy for audio artifacts.
    pub storage_mode: StorageMode,
    /// Minutes a temp-file artifact lives before deletion.
    pub ttl_minutes: u64,
    /// Directory that receives temp-file artifacts.
    pub tmp_dir: PathBuf,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Browser origins allowed by the CORS layer.
    pub cors_allowed_origins: Vec<String>,
    /// Maximum accepted request body size for uploads.
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load configuration from process environment variables, reading `.env` first when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, performing validation along the way.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let storage_mode = match optional("STORAGE_MODE") {
            Some(value) => value.parse().map_err(|()| {
                ConfigError::InvalidValue(format!(
                    "STORAGE_MODE (expected 'stream' or 'tempfile', got '{value}')"
                ))
            })?,
            None => StorageMode::Stream,
        };

        Ok(Self {
            openai_api_key: optional("OPENAI_API_KEY")
                .ok_or_else(|| ConfigError::MissingVariable("OPENAI_API_KEY".to_string()))?,
            openai_base_url: optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            tts_voice: optional("TTS_VOICE").unwrap_or_else(|| DEFAULT_TTS_VOICE.to_string()),
            tts_model: optional("TTS_MODEL").unwrap_or_else(|| DEFAULT_TTS_MODEL.to_string()),
            summary_model: optional("SUMMARY_MODEL")
                .unwrap_or_else(|| DEFAULT_SUMMARY_MODEL.to_string()),
            summary_words: parse_or("SUMMARY_WORDS", optional("SUMMARY_WORDS"))?
                .unwrap_or(DEFAULT_SUMMARY_WORDS),
            storage_mode,
            ttl_minutes: parse_or("TTL_MINUTES", optional("TTL_MINUTES"))?
                .unwrap_or(DEFAULT_TTL_MINUTES),
            tmp_dir: optional("TMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| env::temp_dir().join(TMP_SUBFOLDER)),
            server_port: parse_or("SERVER_PORT", optional("SERVER_PORT"))?,
            cors_allowed_origins: optional("CORS_ALLOWED_ORIGINS")
                .map(|value| split_list(&value))
                .unwrap_or_else(|| vec![DEFAULT_CORS_ORIGIN.to_string()]),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", optional("MAX_UPLOAD_BYTES"))?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        })
    }

    /// Lifetime of a temp-file artifact.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_minutes.saturating_mul(60))
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("openai_api_key", &"<redacted>")
            .field("openai_base_url", &self.openai_base_url)
            .field("tts_voice", &self.tts_voice)
            .field("tts_model", &self.tts_model)
            .field("summary_model", &self.summary_model)
            .field("summary_words", &self.summary_words)
            .field("storage_mode", &self.storage_mode)
            .field("ttl_minutes", &self.ttl_minutes)
            .field("tmp_dir", &self.tmp_dir)
            .field("server_port", &self.server_port)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, value: Option<String>) -> Result<Option<T>, ConfigError> {
    value
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load configuration from the environment and log the effective settings.
pub fn load() -> Result<Config, ConfigError> {
    let config = Config::from_env()?;
    tracing::debug!(
        base_url = %config.openai_base_url,
        summary_model = %config.summary_model,
        tts_voice = %config.tts_voice,
        storage_mode = %config.storage_mode,
        ttl_minutes = config.ttl_minutes,
        tmp_dir = %config.tmp_dir.display(),
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(config)
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "OPENAI_API_KEY" => Some("test-key".to_string()),
        _ => None,
    })
    .expect("test configuration")
}
