//! Plain-language summaries via a remote chat-completion endpoint.
//!
//! The prompt asks for roughly `target_words` words and caps the completion at three tokens
//! per requested word. The cap bounds cost; it does not enforce the length, which stays
//! advisory.

use crate::config::Config;
use crate::upstream::{describe_failure, endpoint};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Summary length used when the caller does not ask for one.
pub const DEFAULT_TARGET_WORDS: usize = 200;

const TOKENS_PER_WORD: usize = 3;

/// Errors surfaced while requesting a summary.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// The provider could not be contacted at all (DNS, proxy, refused connection, offline).
    #[error("Could not reach OpenAI servers. Check your internet connection or proxy settings.")]
    UpstreamUnreachable(String),
    /// The provider answered with an error status.
    #[error("Summarization failed: {0}")]
    UpstreamError(String),
    /// The provider answered successfully but the body was unusable.
    #[error("Summarization failed: malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by summarization providers.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Summarize `text` in approximately `target_words` words.
    async fn summarize(
        &self,
        text: &str,
        target_words: usize,
    ) -> Result<String, SummarizationClientError>;
}

/// Build the single-turn prompt sent to the model.
pub fn build_prompt(text: &str, target_words: usize) -> String {
    format!(
        "Summarise the following document in about {target_words} words. Use plain language and \
         keep the perspective the document was written in (for example first or third person):\n\n{text}"
    )
}

/// Completion token budget for a summary of `target_words` words.
pub fn max_tokens_for(target_words: usize) -> usize {
    target_words.saturating_mul(TOKENS_PER_WORD)
}

/// Chat-completions client for OpenAI-compatible providers.
pub struct OpenAiSummarizationClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiSummarizationClient {
    /// Create a client using the shared HTTP transport and the configured model.
    pub fn new(http: Client, config: &Config) -> Self {
        Self {
            http,
            base_url: config.openai_base_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.summary_model.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl SummarizationClient for OpenAiSummarizationClient {
    async fn summarize(
        &self,
        text: &str,
        target_words: usize,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": build_prompt(text, target_words) }],
            "max_tokens": max_tokens_for(target_words),
        });
        tracing::debug!(
            model = %self.model,
            target_words,
            input_chars = text.len(),
            "Requesting summary"
        );

        let response = self
            .http
            .post(endpoint(&self.base_url, "chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                tracing::warn!(base_url = %self.base_url, %error, "Summarization provider unreachable");
                SummarizationClientError::UpstreamUnreachable(error.to_string())
            })?;

        if !response.status().is_success() {
            return Err(SummarizationClientError::UpstreamError(
                describe_failure(response).await,
            ));
        }

        let body: ChatCompletion = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode chat completion: {error}"
            ))
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| {
                SummarizationClientError::InvalidResponse("completion had no content".into())
            })
    }
}
