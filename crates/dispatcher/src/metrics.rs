//! Executor metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by all actions running on one executor
#[derive(Debug, Default)]
pub struct ActionMetrics {
    /// Total actions submitted
    submitted_count: AtomicU64,
    /// Total actions that returned Ok (including suppressed/skipped paths)
    completed_count: AtomicU64,
    /// Total retry re-invocations
    retried_count: AtomicU64,
    /// Total actions abandoned after their final attempt
    failed_count: AtomicU64,
}

impl ActionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted_count(&self) -> u64 {
        self.submitted_count.load(Ordering::Relaxed)
    }

    pub fn inc_submitted_count(&self) {
        self.submitted_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn completed_count(&self) -> u64 {
        self.completed_count.load(Ordering::Relaxed)
    }

    pub fn inc_completed_count(&self) {
        self.completed_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn retried_count(&self) -> u64 {
        self.retried_count.load(Ordering::Relaxed)
    }

    pub fn inc_retried_count(&self) {
        self.retried_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed_count(&self) -> u64 {
        self.failed_count.load(Ordering::Relaxed)
    }

    pub fn inc_failed_count(&self) {
        self.failed_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted_count: self.submitted_count(),
            completed_count: self.completed_count(),
            retried_count: self.retried_count(),
            failed_count: self.failed_count(),
        }
    }
}

/// Snapshot of executor metrics (for reporting)
#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub submitted_count: u64,
    pub completed_count: u64,
    pub retried_count: u64,
    pub failed_count: u64,
}
