//! Shapes synthesized audio into an HTTP response according to the storage strategy.

use super::error::ApiError;
use crate::speech::AudioArtifact;
use crate::storage::{ArtifactStore, StorageError, StoredArtifact};
use axum::{
    body::Body,
    http::{StatusCode, header},
    response::Response,
};
use std::path::Path;
use tokio_util::io::ReaderStream;

/// Hand `artifact` to the store and build the attachment response.
///
/// File-backed artifacts are streamed from disk. Their deletion is armed once the response
/// has been built, or as soon as the file cannot be served.
pub(crate) async fn deliver_audio(
    store: &ArtifactStore,
    artifact: AudioArtifact,
) -> Result<Response, ApiError> {
    let filename = artifact.suggested_filename;
    let mime_type = artifact.mime_type();
    let stored = store.save(artifact.bytes).await?;

    let (body, length) = stored_body(store, &stored).await?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .header(header::CONTENT_LENGTH, length)
        .body(body);

    store.release(&stored);
    response.map_err(|error| ApiError::Internal(format!("Failed to build audio response: {error}")))
}

async fn stored_body(
    store: &ArtifactStore,
    stored: &StoredArtifact,
) -> Result<(Body, u64), ApiError> {
    match stored {
        StoredArtifact::Inline(bytes) => Ok((Body::from(bytes.clone()), bytes.len() as u64)),
        StoredArtifact::File(path) => open_artifact(path).await.map_err(|error| {
            store.release(stored);
            ApiError::from(error)
        }),
    }
}

async fn open_artifact(path: &Path) -> Result<(Body, u64), StorageError> {
    let io_error = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = tokio::fs::File::open(path).await.map_err(io_error)?;
    let length = file.metadata().await.map_err(io_error)?.len();
    tracing::debug!(path = %path.display(), bytes = length, "Serving file-backed artifact");
    Ok((Body::from_stream(ReaderStream::new(file)), length))
}
