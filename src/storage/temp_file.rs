use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use super::StorageError;
use super::cleanup::{CleanupScheduler, remove_artifact};

const ARTIFACT_EXTENSION: &str = "mp3";

/// Persists artifacts under a directory and deletes them after a fixed lifetime.
#[derive(Clone)]
pub struct TempFileStore {
    dir: PathBuf,
    ttl: Duration,
    scheduler: CleanupScheduler,
}

impl TempFileStore {
    /// Create a store writing into `dir`; the directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            scheduler: CleanupScheduler::new(),
        }
    }

    /// Directory receiving artifacts.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Lifetime of each artifact once its cleanup has been armed.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Scheduler tracking pending deletions.
    pub fn scheduler(&self) -> &CleanupScheduler {
        &self.scheduler
    }

    /// Write `bytes` to a freshly named file and return its path.
    ///
    /// Names are random UUIDs, so concurrent writers never collide. A failed write removes
    /// whatever part of the file reached the disk.
    pub async fn write(&self, bytes: &Bytes) -> Result<PathBuf, StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StorageError::Io {
                path: self.dir.clone(),
                source,
            })?;
        let path = self
            .dir
            .join(format!("{}.{ARTIFACT_EXTENSION}", Uuid::new_v4()));
        if let Err(source) = tokio::fs::write(&path, bytes).await {
            remove_artifact(&path).await;
            return Err(StorageError::Io { path, source });
        }
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Artifact written");
        Ok(path)
    }

    /// Arm the deferred deletion of `path` after the store's TTL.
    pub fn expire(&self, path: PathBuf) {
        tracing::debug!(
            path = %path.display(),
            ttl_secs = self.ttl.as_secs(),
            "Artifact deletion scheduled"
        );
        self.scheduler.schedule(path, self.ttl);
    }
}
