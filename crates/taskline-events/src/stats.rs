//! Emission statistics.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Snapshot of the per-callback outcomes recorded by one bus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitStatistics {
    /// Callback invocations attempted.
    pub emitted_total: u64,
    /// Invocations that failed.
    pub emit_errors_count: u64,
    /// Subscription ids of failed invocations, in order.
    pub emit_errors: Vec<String>,
    /// Invocations that completed normally.
    pub emit_success_count: u64,
    /// Subscription ids of successful invocations, in order.
    pub emit_success: Vec<String>,
}

impl EmitStatistics {
    /// Ratio of failed invocations, 0.0 when nothing was emitted.
    pub fn error_rate(&self) -> f64 {
        if self.emitted_total == 0 {
            return 0.0;
        }
        self.emit_errors_count as f64 / self.emitted_total as f64
    }
}

/// Outcomes of a single emission, applied to the totals in one step.
#[derive(Debug, Default)]
pub(crate) struct EmissionOutcome {
    succeeded: Vec<String>,
    failed: Vec<String>,
}

impl EmissionOutcome {
    pub(crate) fn success(&mut self, id: &str) {
        self.succeeded.push(id.to_string());
    }

    pub(crate) fn failure(&mut self, id: &str) {
        self.failed.push(id.to_string());
    }
}

/// Running counters owned by a bus.
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    inner: Mutex<EmitStatistics>,
}

impl StatsRecorder {
    pub(crate) fn apply(&self, outcome: EmissionOutcome) {
        let mut stats = self.inner.lock();
        let succeeded = outcome.succeeded.len() as u64;
        let failed = outcome.failed.len() as u64;
        stats.emitted_total += succeeded + failed;
        stats.emit_success_count += succeeded;
        stats.emit_errors_count += failed;
        stats.emit_success.extend(outcome.succeeded);
        stats.emit_errors.extend(outcome.failed);
    }

    pub(crate) fn snapshot(&self) -> EmitStatistics {
        self.inner.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_outcome() {
        let recorder = StatsRecorder::default();
        let mut outcome = EmissionOutcome::default();
        outcome.success("a");
        outcome.failure("b");
        outcome.success("c");
        recorder.apply(outcome);

        let stats = recorder.snapshot();
        assert_eq!(stats.emitted_total, 3);
        assert_eq!(stats.emit_success_count, 2);
        assert_eq!(stats.emit_errors_count, 1);
        assert_eq!(stats.emit_success, vec!["a", "c"]);
        assert_eq!(stats.emit_errors, vec!["b"]);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let recorder = StatsRecorder::default();
        let before = recorder.snapshot();
        let mut outcome = EmissionOutcome::default();
        outcome.success("a");
        recorder.apply(outcome);
        assert_eq!(before.emitted_total, 0);
        assert_eq!(recorder.snapshot().emitted_total, 1);
    }

    #[test]
    fn test_error_rate() {
        assert_eq!(EmitStatistics::default().error_rate(), 0.0);
        let stats = EmitStatistics {
            emitted_total: 4,
            emit_errors_count: 1,
            ..Default::default()
        };
        assert_eq!(stats.error_rate(), 0.25);
    }
}
