//! HTTP plumbing shared by the OpenAI-compatible clients.

use reqwest::{Client, Response};
use serde::Deserialize;

/// Default base URL of the hosted OpenAI API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Build the HTTP client shared by every upstream adapter.
pub fn http_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(concat!("readforme/", env!("CARGO_PKG_VERSION")))
        .build()
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Describe a non-success response, preferring the provider's own error message.
pub(crate) async fn describe_failure(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => format!("{status}: {}", envelope.error.message),
        Err(_) if body.trim().is_empty() => status.to_string(),
        Err(_) => format!("{status}: {}", body.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::endpoint;

    #[test]
    fn endpoint_joins_without_double_slash() {
        assert_eq!(
            endpoint("https://api.openai.com/v1/", "chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            endpoint("http://127.0.0.1:8080", "audio/speech"),
            "http://127.0.0.1:8080/audio/speech"
        );
    }
}
