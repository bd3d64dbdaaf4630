//! Delivery strategies for synthesized audio.
//!
//! The strategy is chosen once at startup from `STORAGE_MODE` and injected into the HTTP
//! state. Pass-through keeps the bytes in memory for an inline response. Temp-file writes the
//! bytes to disk; the file is deleted after the TTL, counted from the moment the response
//! that serves it has been built.

pub mod cleanup;
mod temp_file;

pub use cleanup::CleanupScheduler;
pub use temp_file::TempFileStore;

use crate::config::{Config, StorageMode};
use bytes::Bytes;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while persisting artifacts.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("Failed to store audio artifact at {path}: {source}")]
    Io {
        /// Path being written or opened.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Handle returned by [`ArtifactStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredArtifact {
    /// The bytes themselves, for an inline response.
    Inline(Bytes),
    /// A file on disk awaiting delivery and deletion.
    File(PathBuf),
}

/// Process-wide artifact strategy.
#[derive(Clone)]
pub enum ArtifactStore {
    /// Return bytes unchanged.
    PassThrough,
    /// Persist bytes to a temp file with delayed deletion.
    TempFile(TempFileStore),
}

impl ArtifactStore {
    /// Build the strategy selected by configuration.
    pub fn from_config(config: &Config) -> Self {
        match config.storage_mode {
            StorageMode::Stream => Self::PassThrough,
            StorageMode::TempFile => {
                Self::TempFile(TempFileStore::new(config.tmp_dir.clone(), config.ttl()))
            }
        }
    }

    /// Mode implemented by this store.
    pub fn mode(&self) -> StorageMode {
        match self {
            Self::PassThrough => StorageMode::Stream,
            Self::TempFile(_) => StorageMode::TempFile,
        }
    }

    /// Hand `bytes` to the strategy.
    pub async fn save(&self, bytes: Bytes) -> Result<StoredArtifact, StorageError> {
        match self {
            Self::PassThrough => Ok(StoredArtifact::Inline(bytes)),
            Self::TempFile(store) => store.write(&bytes).await.map(StoredArtifact::File),
        }
    }

    /// Arm cleanup for a delivered artifact. Inline artifacts hold nothing to release.
    pub fn release(&self, artifact: &StoredArtifact) {
        if let (Self::TempFile(store), StoredArtifact::File(path)) = (self, artifact) {
            store.expire(path.clone());
        }
    }
}
