use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity since startup.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_extracted: AtomicU64,
    summaries_generated: AtomicU64,
    audio_delivered: AtomicU64,
    upstream_failures: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a document whose text was extracted successfully.
    pub fn record_extraction(&self) {
        self.documents_extracted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a summary returned by the upstream provider.
    pub fn record_summary(&self) {
        self.summaries_generated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an audio artifact handed to the client.
    pub fn record_audio(&self) {
        self.audio_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed call to the upstream provider.
    pub fn record_upstream_failure(&self) {
        self.upstream_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_extracted: self.documents_extracted.load(Ordering::Relaxed),
            summaries_generated: self.summaries_generated.load(Ordering::Relaxed),
            audio_delivered: self.audio_delivered.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents whose text has been extracted.
    pub documents_extracted: u64,
    /// Summaries produced by the upstream model.
    pub summaries_generated: u64,
    /// Audio artifacts delivered inline or as files.
    pub audio_delivered: u64,
    /// Upstream calls that ended in an error.
    pub upstream_failures: u64,
}
