//! HTTP surface for Read For Me.
//!
//! Every document endpoint accepts a multipart body with a single `file` part and lives under
//! `/api/v1`:
//!
//! - `POST /upload` – Extract the document's text. Returns `{"text": "..."}`.
//! - `POST /summarise` – Extract, then summarise. Returns the summary as plain text.
//! - `POST /summarise-audio` – Extract, summarise, and synthesise the summary as `summary.mp3`.
//! - `POST /to-audio` – Extract and synthesise the full text as `speech.mp3`.
//! - `GET /metrics` – Pipeline counters since startup.
//! - `GET /commands` – Machine-readable command catalog.
//!
//! `GET /` answers `{"status": "ok"}` for health probes.

mod delivery;
pub mod error;
mod upload;

pub use error::{ApiError, ErrorResponse, NO_READABLE_TEXT_MESSAGE};
pub use upload::UPLOAD_CHUNK_SIZE;

use crate::config::Config;
use crate::extract::UploadedDocument;
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::speech::{AudioArtifact, OpenAiSpeechClient, SpeechSynthesizer};
use crate::storage::ArtifactStore;
use crate::summarization::{OpenAiSummarizationClient, SummarizationClient};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderValue, header},
    response::Response,
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

const SPEECH_FILENAME: &str = "speech.mp3";
const SUMMARY_FILENAME: &str = "summary.mp3";

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    summarizer: Arc<dyn SummarizationClient>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    store: ArtifactStore,
    metrics: Arc<PipelineMetrics>,
}

impl AppState {
    /// Assemble state from explicit collaborators.
    pub fn new(
        config: Arc<Config>,
        summarizer: Arc<dyn SummarizationClient>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        store: ArtifactStore,
    ) -> Self {
        Self {
            config,
            summarizer,
            synthesizer,
            store,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Build the production state: OpenAI-compatible clients sharing `http`, and the storage
    /// strategy selected by configuration.
    pub fn from_config(config: Arc<Config>, http: reqwest::Client) -> Self {
        let summarizer = Arc::new(OpenAiSummarizationClient::new(http.clone(), &config));
        let synthesizer = Arc::new(OpenAiSpeechClient::new(http, &config));
        let store = ArtifactStore::from_config(&config);
        Self::new(config, summarizer, synthesizer, store)
    }

    /// Storage strategy in use.
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Counters updated by the handlers.
    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }
}

/// Build the HTTP router exposing the document pipeline.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    let v1 = Router::new()
        .route("/upload", post(upload_document))
        .route("/summarise", post(summarise_document))
        .route("/summarise-audio", post(summarise_document_audio))
        .route("/to-audio", post(document_to_audio))
        .route("/metrics", get(get_metrics))
        .route("/commands", get(get_commands));

    Router::new()
        .route("/", get(health))
        .nest("/api/v1", v1)
        .layer(body_limit)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(origin = %origin, %error, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([header::CONTENT_DISPOSITION])
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Success response for `POST /upload`.
#[derive(Serialize)]
struct UploadResponse {
    text: String,
}

/// Extract a document's text without any emptiness check.
async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let document = upload::read_upload(&mut multipart).await?;
    let text = extract(&state, document).await?;
    Ok(Json(UploadResponse { text }))
}

/// Summarise a document and return the summary as `text/plain`.
async fn summarise_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<String, ApiError> {
    let document = upload::read_upload(&mut multipart).await?;
    let text = require_readable(extract(&state, document).await?)?;
    summarise(&state, &text).await
}

/// Summarise a document and synthesise the summary.
async fn summarise_document_audio(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let document = upload::read_upload(&mut multipart).await?;
    let text = require_readable(extract(&state, document).await?)?;
    let summary = summarise(&state, &text).await?;
    let audio = state.synthesizer.synthesize(&summary).await.map_err(|error| {
        state.metrics.record_upstream_failure();
        ApiError::Speech(error)
    })?;
    deliver(&state, AudioArtifact::new(audio, SUMMARY_FILENAME)).await
}

/// Synthesise a document's full text.
async fn document_to_audio(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let document = upload::read_upload(&mut multipart).await?;
    let text = extract(&state, document).await?;
    let audio = state.synthesizer.synthesize(&text).await.map_err(|error| {
        state.metrics.record_upstream_failure();
        ApiError::SpeechGateway(error)
    })?;
    deliver(&state, AudioArtifact::new(audio, SPEECH_FILENAME)).await
}

async fn extract(state: &AppState, document: UploadedDocument) -> Result<String, ApiError> {
    let filename = document.filename.clone();
    let kind = document.kind;
    let bytes = document.bytes.len();
    let text = tokio::task::spawn_blocking(move || document.extract())
        .await
        .map_err(|error| ApiError::ExtractionTask(error.to_string()))??;
    state.metrics.record_extraction();
    tracing::info!(
        filename = %filename,
        extension = kind.extension(),
        bytes,
        chars = text.len(),
        "Document extracted"
    );
    Ok(text)
}

fn require_readable(text: String) -> Result<String, ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::NoReadableText);
    }
    Ok(text)
}

async fn summarise(state: &AppState, text: &str) -> Result<String, ApiError> {
    let summary = state
        .summarizer
        .summarize(text, state.config.summary_words)
        .await
        .map_err(|error| {
            state.metrics.record_upstream_failure();
            ApiError::from(error)
        })?;
    state.metrics.record_summary();
    tracing::info!(
        target_words = state.config.summary_words,
        chars = summary.len(),
        "Summary generated"
    );
    Ok(summary)
}

async fn deliver(state: &AppState, artifact: AudioArtifact) -> Result<Response, ApiError> {
    let filename = artifact.suggested_filename;
    let bytes = artifact.bytes.len();
    let response = delivery::deliver_audio(&state.store, artifact).await?;
    state.metrics.record_audio();
    tracing::info!(
        filename,
        bytes,
        storage_mode = %state.store.mode(),
        "Audio delivered"
    );
    Ok(response)
}

/// Return the pipeline counters.
async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery by front-ends and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "upload",
                method: "POST",
                path: "/api/v1/upload",
                description: "Extract text from a .pdf, .docx, .xml or .txt upload (multipart field `file`). Response returns { \"text\": string }.",
            },
            CommandDescriptor {
                name: "summarise",
                method: "POST",
                path: "/api/v1/summarise",
                description: "Extract text and return a plain-language summary as text/plain.",
            },
            CommandDescriptor {
                name: "summarise_audio",
                method: "POST",
                path: "/api/v1/summarise-audio",
                description: "Extract, summarise, and return the spoken summary as summary.mp3.",
            },
            CommandDescriptor {
                name: "to_audio",
                method: "POST",
                path: "/api/v1/to-audio",
                description: "Extract text and return it read aloud as speech.mp3.",
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/api/v1/metrics",
                description: "Return pipeline counters useful for observability dashboards.",
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StorageMode, test_config};
    use crate::extract::fixtures;
    use crate::speech::SpeechClientError;
    use crate::storage::TempFileStore;
    use crate::summarization::SummarizationClientError;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use bytes::Bytes;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "readforme-test-boundary";

    #[derive(Clone, Default)]
    struct StubSummarizer {
        calls: Arc<Mutex<Vec<(String, usize)>>>,
        unreachable: bool,
    }

    impl StubSummarizer {
        fn unreachable() -> Self {
            Self {
                unreachable: true,
                ..Self::default()
            }
        }

        async fn recorded_calls(&self) -> Vec<(String, usize)> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl SummarizationClient for StubSummarizer {
        async fn summarize(
            &self,
            text: &str,
            target_words: usize,
        ) -> Result<String, SummarizationClientError> {
            self.calls.lock().await.push((text.to_string(), target_words));
            if self.unreachable {
                return Err(SummarizationClientError::UpstreamUnreachable(
                    "connection refused".into(),
                ));
            }
            Ok(format!("summary of {} chars", text.len()))
        }
    }

    #[derive(Clone, Default)]
    struct StubSynthesizer {
        inputs: Arc<Mutex<Vec<String>>>,
        failing: bool,
    }

    impl StubSynthesizer {
        fn failing() -> Self {
            Self {
                failing: true,
                ..Self::default()
            }
        }

        async fn recorded_inputs(&self) -> Vec<String> {
            self.inputs.lock().await.clone()
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for StubSynthesizer {
        async fn synthesize(&self, text: &str) -> Result<Bytes, SpeechClientError> {
            self.inputs.lock().await.push(text.to_string());
            if self.failing {
                return Err(SpeechClientError::SynthesisFailed("quota exceeded".into()));
            }
            Ok(Bytes::from_static(b"ID3\x04fake-mp3"))
        }
    }

    fn state_with(
        summarizer: StubSummarizer,
        synthesizer: StubSynthesizer,
        store: ArtifactStore,
    ) -> AppState {
        AppState::new(
            Arc::new(test_config()),
            Arc::new(summarizer),
            Arc::new(synthesizer),
            store,
        )
    }

    fn default_state() -> AppState {
        state_with(
            StubSummarizer::default(),
            StubSynthesizer::default(),
            ArtifactStore::PassThrough,
        )
    }

    fn multipart_request(path: &str, filename: &str, content: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = create_router(default_state())
            .oneshot(Request::get("/").body(Body::empty()).expect("request"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn upload_returns_extracted_text() {
        let response = create_router(default_state())
            .oneshot(multipart_request("/api/v1/upload", "note.txt", b"Hello world"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "text": "Hello world" }));
    }

    #[tokio::test]
    async fn upload_allows_empty_text() {
        let response = create_router(default_state())
            .oneshot(multipart_request("/api/v1/upload", "blank.xml", fixtures::EMPTY_XML))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["text"], "");
    }

    #[tokio::test]
    async fn disallowed_extension_is_rejected_before_extraction() {
        let summarizer = StubSummarizer::default();
        let state = state_with(
            summarizer.clone(),
            StubSynthesizer::default(),
            ArtifactStore::PassThrough,
        );

        for path in [
            "/api/v1/upload",
            "/api/v1/summarise",
            "/api/v1/summarise-audio",
            "/api/v1/to-audio",
        ] {
            let response = create_router(state.clone())
                .oneshot(multipart_request(path, "report.exe", b"Hello world"))
                .await
                .expect("router response");
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");
            assert_eq!(
                json_body(response).await["detail"],
                "Unsupported file type",
                "{path}"
            );
        }
        assert!(summarizer.recorded_calls().await.is_empty());
        assert_eq!(state.metrics().snapshot().documents_extracted, 0);
    }

    #[tokio::test]
    async fn missing_filename_is_rejected() {
        let response = create_router(default_state())
            .oneshot(multipart_request("/api/v1/upload", "", b"Hello world"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["detail"], "No file provided");
    }

    #[tokio::test]
    async fn corrupt_document_maps_to_unsupported_media_type() {
        let response = create_router(default_state())
            .oneshot(multipart_request("/api/v1/upload", "broken.docx", b"not a zip"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let detail = json_body(response).await["detail"]
            .as_str()
            .expect("detail")
            .to_string();
        assert!(detail.contains("DOCX"), "unexpected detail: {detail}");
    }

    #[tokio::test]
    async fn summarise_returns_plain_text() {
        let summarizer = StubSummarizer::default();
        let state = state_with(
            summarizer.clone(),
            StubSynthesizer::default(),
            ArtifactStore::PassThrough,
        );

        let response = create_router(state.clone())
            .oneshot(multipart_request("/api/v1/summarise", "note.txt", b"Hello world"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .expect("content type")
                .starts_with("text/plain")
        );
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        assert_eq!(&body[..], b"summary of 11 chars");
        assert_eq!(
            summarizer.recorded_calls().await,
            vec![("Hello world".to_string(), 200)]
        );
        let snapshot = state.metrics().snapshot();
        assert_eq!(snapshot.documents_extracted, 1);
        assert_eq!(snapshot.summaries_generated, 1);
    }

    #[tokio::test]
    async fn summary_endpoints_reject_unreadable_documents() {
        let summarizer = StubSummarizer::default();
        let state = state_with(
            summarizer.clone(),
            StubSynthesizer::default(),
            ArtifactStore::PassThrough,
        );

        for path in ["/api/v1/summarise", "/api/v1/summarise-audio"] {
            let response = create_router(state.clone())
                .oneshot(multipart_request(path, "blank.xml", fixtures::EMPTY_XML))
                .await
                .expect("router response");
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{path}");
            assert_eq!(json_body(response).await["detail"], NO_READABLE_TEXT_MESSAGE);
        }
        assert!(summarizer.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn unreachable_summarizer_is_a_bad_gateway() {
        let state = state_with(
            StubSummarizer::unreachable(),
            StubSynthesizer::default(),
            ArtifactStore::PassThrough,
        );

        let response = create_router(state.clone())
            .oneshot(multipart_request("/api/v1/summarise-audio", "note.txt", b"Hello world"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            json_body(response).await["detail"],
            "Could not reach OpenAI servers. Check your internet connection or proxy settings."
        );
        assert_eq!(state.metrics().snapshot().upstream_failures, 1);
    }

    #[tokio::test]
    async fn to_audio_streams_inline_speech() {
        let synthesizer = StubSynthesizer::default();
        let state = state_with(
            StubSummarizer::default(),
            synthesizer.clone(),
            ArtifactStore::PassThrough,
        );

        let response = create_router(state.clone())
            .oneshot(multipart_request("/api/v1/to-audio", "note.txt", b"Read me aloud"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"speech.mp3\""
        );
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        assert_eq!(&body[..], b"ID3\x04fake-mp3");
        assert_eq!(synthesizer.recorded_inputs().await, vec!["Read me aloud"]);
        assert_eq!(state.metrics().snapshot().audio_delivered, 1);
    }

    #[tokio::test]
    async fn summarise_audio_speaks_the_summary() {
        let synthesizer = StubSynthesizer::default();
        let state = state_with(
            StubSummarizer::default(),
            synthesizer.clone(),
            ArtifactStore::PassThrough,
        );

        let response = create_router(state)
            .oneshot(multipart_request("/api/v1/summarise-audio", "note.txt", b"Hello world"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"summary.mp3\""
        );
        assert_eq!(
            synthesizer.recorded_inputs().await,
            vec!["summary of 11 chars"]
        );
    }

    #[tokio::test]
    async fn synthesis_failure_status_depends_on_endpoint() {
        let state = state_with(
            StubSummarizer::default(),
            StubSynthesizer::failing(),
            ArtifactStore::PassThrough,
        );

        let response = create_router(state.clone())
            .oneshot(multipart_request("/api/v1/to-audio", "note.txt", b"Hello world"))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["detail"], "TTS failed: quota exceeded");

        let response = create_router(state)
            .oneshot(multipart_request("/api/v1/summarise-audio", "note.txt", b"Hello world"))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await["detail"],
            "Error generating speech: quota exceeded"
        );
    }

    #[tokio::test]
    async fn temp_file_mode_serves_then_deletes_the_artifact() {
        let dir = TempDir::new().expect("tempdir");
        let temp = TempFileStore::new(dir.path(), Duration::from_millis(100));
        let state = state_with(
            StubSummarizer::default(),
            StubSynthesizer::default(),
            ArtifactStore::TempFile(temp.clone()),
        );
        assert_eq!(state.store().mode(), StorageMode::TempFile);

        let response = create_router(state)
            .oneshot(multipart_request("/api/v1/to-audio", "note.txt", b"Hello world"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        assert_eq!(&body[..], b"ID3\x04fake-mp3");

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(temp.scheduler().pending(), 0);
        let mut entries = tokio::fs::read_dir(dir.path()).await.expect("read dir");
        assert!(entries.next_entry().await.expect("entry").is_none());
    }

    #[tokio::test]
    async fn metrics_and_commands_are_exposed() {
        let app = create_router(default_state());

        let response = app
            .clone()
            .oneshot(Request::get("/api/v1/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["documents_extracted"], 0);

        let catalog = get_commands().await.0.commands;
        let upload = catalog
            .iter()
            .find(|cmd| cmd.name == "upload")
            .expect("upload command present");
        assert_eq!(upload.method, "POST");
        assert_eq!(upload.path, "/api/v1/upload");
        assert!(catalog.len() >= 4);
    }
}
