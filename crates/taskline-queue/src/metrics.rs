//! Executor metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Executor metrics.
#[derive(Debug, Default)]
pub struct ExecutorMetrics {
    /// Drain cycles started.
    pub cycles: AtomicU64,

    /// Task attempts started.
    pub tasks_started: AtomicU64,

    /// Task attempts that resolved.
    pub succeeded: AtomicU64,

    /// Task attempts that failed.
    pub failures: AtomicU64,

    /// Tasks re-submitted after a failure.
    pub retries: AtomicU64,

    /// Tasks dropped after their final failure.
    pub dropped: AtomicU64,

    /// Fire-and-forget tasks launched.
    pub detached: AtomicU64,
}

impl ExecutorMetrics {
    /// Create new metrics.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_task_started(&self) {
        self.tasks_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_detached(&self) {
        self.detached.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of the metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            tasks_started: self.tasks_started.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            detached: self.detached.load(Ordering::Relaxed),
            in_flight: 0,
        }
    }
}

/// Snapshot of executor metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub cycles: u64,
    pub tasks_started: u64,
    pub succeeded: u64,
    pub failures: u64,
    pub retries: u64,
    pub dropped: u64,
    pub detached: u64,
    /// Fire-and-forget work still running. Filled in by the executor.
    pub in_flight: u64,
}

impl MetricsSnapshot {
    /// Attempts that neither resolved nor failed, such as work that
    /// returned without settling or detached work still running.
    pub fn unsettled(&self) -> u64 {
        self.tasks_started
            .saturating_sub(self.succeeded)
            .saturating_sub(self.failures)
    }

    /// Average attempts per drain cycle.
    pub fn tasks_per_cycle(&self) -> f64 {
        if self.cycles == 0 {
            return 0.0;
        }
        self.tasks_started as f64 / self.cycles as f64
    }
}
