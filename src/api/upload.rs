//! Multipart upload validation and buffering.

use super::error::ApiError;
use crate::extract::{DocumentKind, UploadedDocument};
use axum::extract::Multipart;
use axum::extract::multipart::{Field, MultipartError};
use bytes::{Bytes, BytesMut};
use futures_util::TryStreamExt;
use std::io;
use tokio::io::AsyncReadExt;
use tokio_util::io::StreamReader;

/// Size of each read from the upload stream.
pub const UPLOAD_CHUNK_SIZE: usize = 1_048_576;

const FILE_FIELD: &str = "file";

/// Validate the `file` part of a multipart body and buffer it in memory.
///
/// Validation happens on the filename before any of the body is read.
pub(crate) async fn read_upload(multipart: &mut Multipart) -> Result<UploadedDocument, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| ApiError::InvalidInput("No file provided".into()))?;
        let kind = DocumentKind::from_filename(&filename)
            .ok_or_else(|| ApiError::InvalidInput("Unsupported file type".into()))?;

        let bytes = buffer_field(field).await?;
        tracing::debug!(filename = %filename, ?kind, bytes = bytes.len(), "Upload buffered");
        return Ok(UploadedDocument {
            filename,
            kind,
            bytes,
        });
    }

    Err(ApiError::InvalidInput("No file provided".into()))
}

async fn buffer_field(field: Field<'_>) -> Result<Bytes, ApiError> {
    let reader = StreamReader::new(field.map_err(io::Error::other));
    tokio::pin!(reader);

    let mut buffer = BytesMut::new();
    let mut chunk = vec![0_u8; UPLOAD_CHUNK_SIZE];
    loop {
        let read = reader.read(&mut chunk).await.map_err(read_error)?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }
    Ok(buffer.freeze())
}

fn read_error(error: io::Error) -> ApiError {
    let kind = error.kind();
    match error.into_inner() {
        Some(inner) => match inner.downcast::<MultipartError>() {
            Ok(multipart) => ApiError::Multipart(*multipart),
            Err(other) => ApiError::InvalidInput(format!("Failed to read upload: {other}")),
        },
        None => ApiError::InvalidInput(format!("Failed to read upload: {kind}")),
    }
}
