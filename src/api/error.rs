//! Mapping of pipeline failures onto HTTP responses.

use crate::extract::ExtractError;
use crate::speech::SpeechClientError;
use crate::storage::StorageError;
use crate::summarization::SummarizationClientError;
use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Shown when a document extracts to nothing but whitespace.
pub const NO_READABLE_TEXT_MESSAGE: &str = "Could not extract readable text from this document. \
If it is a scanned or image-only PDF, please run OCR first.";

/// Failures surfaced by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing file or disallowed extension; the caller can fix the request.
    #[error("{0}")]
    InvalidInput(String),
    /// The multipart body could not be read.
    #[error("{0}")]
    Multipart(#[from] MultipartError),
    /// The parser rejected the document.
    #[error("{0}")]
    Extraction(#[from] ExtractError),
    /// The extraction task died before producing a result.
    #[error("Extraction failed: {0}")]
    ExtractionTask(String),
    /// Extraction succeeded but produced only whitespace.
    #[error("{}", NO_READABLE_TEXT_MESSAGE)]
    NoReadableText,
    /// The summarization provider failed or could not be reached.
    #[error("{0}")]
    Summarization(#[from] SummarizationClientError),
    /// Speech synthesis failed on the raw-text audio endpoint.
    #[error("TTS failed: {0}")]
    SpeechGateway(#[source] SpeechClientError),
    /// Speech synthesis failed on the summary audio endpoint.
    #[error("Error generating speech: {0}")]
    Speech(#[source] SpeechClientError),
    /// The artifact could not be stored or reopened.
    #[error("{0}")]
    Storage(#[from] StorageError),
    /// Any other unexpected failure.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status associated with the failure.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Multipart(error) => error.status(),
            Self::Extraction(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NoReadableText => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Summarization(SummarizationClientError::UpstreamUnreachable(_))
            | Self::SpeechGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Summarization(_)
            | Self::Speech(_)
            | Self::ExtractionTask(_)
            | Self::Storage(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable description of the failure.
    pub detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %detail, "Request failed");
        } else {
            tracing::info!(status = status.as_u16(), error = %detail, "Request rejected");
        }
        (status, Json(ErrorResponse { detail })).into_response()
    }
}
