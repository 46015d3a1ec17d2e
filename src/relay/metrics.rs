use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Narrow sink the relay reports counts and durations through.
///
/// Exporting them (OpenTelemetry, Prometheus, ...) is the host's concern.
pub trait RelayMetrics: Send + Sync {
    /// Called once per successfully dispatched batch with its message count.
    fn increment_published(&self, count: usize);

    /// Called once per failed batch with its message count.
    fn increment_failed(&self, count: usize);

    /// Called once per tick with the time the tick spent working.
    fn record_processing_time(&self, elapsed: Duration);
}

/// Metrics sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl RelayMetrics for NoopMetrics {
    fn increment_published(&self, _count: usize) {}

    fn increment_failed(&self, _count: usize) {}

    fn record_processing_time(&self, _elapsed: Duration) {}
}

/// Statistics from the relay.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub messages_published: u64,
    /// Number of `increment_published` calls, i.e. batches delivered.
    pub published_calls: u64,
    pub messages_failed: u64,
    pub processing_times: Vec<Duration>,
}

/// In-process metrics sink that keeps running totals.
#[derive(Debug, Default)]
pub struct RelayStats {
    messages_published: AtomicU64,
    published_calls: AtomicU64,
    messages_failed: AtomicU64,
    processing_times: Mutex<Vec<Duration>>,
}

impl RelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            messages_published: self.messages_published.load(Ordering::Relaxed),
            published_calls: self.published_calls.load(Ordering::Relaxed),
            messages_failed: self.messages_failed.load(Ordering::Relaxed),
            processing_times: self
                .processing_times
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}

impl RelayMetrics for RelayStats {
    fn increment_published(&self, count: usize) {
        self.messages_published
            .fetch_add(count as u64, Ordering::Relaxed);
        self.published_calls.fetch_add(1, Ordering::Relaxed);
    }

    fn increment_failed(&self, count: usize) {
        self.messages_failed.fetch_add(count as u64, Ordering::Relaxed);
    }

    fn record_processing_time(&self, elapsed: Duration) {
        self.processing_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(elapsed);
    }
}
