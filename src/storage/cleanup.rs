//! Deferred deletion of temp-file artifacts.
//!
//! Each path owns at most one pending deletion. Scheduling the same path again replaces the
//! earlier timer, and a pending deletion can be cancelled. Timers live only in memory: a
//! restart drops them and leaves the files behind for external cleanup.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

struct PendingDeletion {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Registry {
    pending: Mutex<HashMap<PathBuf, PendingDeletion>>,
    generations: AtomicU64,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, PendingDeletion>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Schedules background deletions keyed by path.
#[derive(Clone, Default)]
pub struct CleanupScheduler {
    registry: Arc<Registry>,
}

impl CleanupScheduler {
    /// Create a scheduler with no pending deletions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delete `path` once `delay` has elapsed, replacing any deletion already pending for it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule(&self, path: PathBuf, delay: Duration) {
        let generation = self.registry.generations.fetch_add(1, Ordering::Relaxed);
        let registry = Arc::clone(&self.registry);
        let task_path = path.clone();

        let mut pending = self.registry.lock();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            remove_artifact(&task_path).await;
            let mut pending = registry.lock();
            if pending
                .get(&task_path)
                .is_some_and(|entry| entry.generation == generation)
            {
                pending.remove(&task_path);
            }
        });
        if let Some(previous) = pending.insert(path, PendingDeletion { generation, handle }) {
            previous.handle.abort();
        }
    }

    /// Abort the pending deletion for `path`. Returns `true` when one was pending.
    pub fn cancel(&self, path: &Path) -> bool {
        match self.registry.lock().remove(path) {
            Some(entry) => {
                entry.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Number of deletions that have not run yet.
    pub fn pending(&self) -> usize {
        self.registry.lock().len()
    }
}

/// Remove an artifact, treating an already-missing file as success.
pub(crate) async fn remove_artifact(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Expired artifact deleted"),
        Err(error) if error.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Expired artifact already gone");
        }
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "Failed to delete expired artifact");
        }
    }
}
