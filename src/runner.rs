//! Synthetic batch runner.
//!
//! Dispatches a configurable batch of tasks through a [`Queue`], with some
//! tasks failing permanently, some failing only on their first attempt and
//! some running fire-and-forget, then reports what happened.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use taskline_events::{EmitStatistics, EventBusConfig, LifecycleEvent};
use taskline_queue::{MetricsSnapshot, Queue, QueueEvent, TaskOptions};

/// Shape of a synthetic batch. Task indexes start at 1.
#[derive(Debug, Clone, Default)]
pub struct RunPlan {
    pub tasks: u64,
    /// Every Nth task always rejects (0 = never).
    pub fail_every: u64,
    /// Every Nth task rejects on its first attempt only (0 = never).
    pub flaky_every: u64,
    /// Every Nth task is fire-and-forget (0 = never).
    pub detach_every: u64,
    /// Per-task retry limit; the queue default applies when unset.
    pub retries: Option<u32>,
    /// Simulated work duration per attempt.
    pub work: Duration,
}

impl RunPlan {
    fn every(n: u64, index: u64) -> bool {
        n > 0 && index % n == 0
    }

    pub fn fails(&self, index: u64) -> bool {
        Self::every(self.fail_every, index)
    }

    pub fn is_flaky(&self, index: u64) -> bool {
        !self.fails(index) && Self::every(self.flaky_every, index)
    }

    pub fn is_detached(&self, index: u64) -> bool {
        Self::every(self.detach_every, index)
    }

    fn options(&self, index: u64) -> TaskOptions {
        let mut options = TaskOptions::new();
        if let Some(retries) = self.retries {
            options = options.retry_limit(retries);
        }
        if self.is_detached(index) {
            options = options.fire_and_forget(true);
        }
        options
    }
}

/// Outcome of a batch.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub tasks: u64,
    pub resolved: u64,
    pub failed: u64,
    /// Sum of resolved values.
    pub total: u64,
    pub elapsed_ms: u64,
    pub errors: Vec<String>,
    pub metrics: MetricsSnapshot,
    pub statistics: EmitStatistics,
}

/// Log lifecycle events that pass the allow-list. Returns how many were subscribed.
pub fn observe(queue: &Queue<u64>, events: &EventBusConfig) -> usize {
    let mut subscribed = 0;
    for event in LifecycleEvent::ALL {
        if !events.allows(event.as_str()) {
            debug!(event = %event, "Lifecycle event not in allow-list; not logging it");
            continue;
        }

        let id = match event {
            LifecycleEvent::QueueStart | LifecycleEvent::QueueEnd => {
                queue.on(event, |e: &QueueEvent| {
                    debug!(event = %e.name, at = %e.timestamp, "Queue lifecycle");
                    Ok(())
                })
            }
            LifecycleEvent::Error => queue.on(event, |e: &QueueEvent| {
                if let Some(error) = &e.payload {
                    warn!(error = %error, "Task attempt failed");
                }
                Ok(())
            }),
        };
        if id.is_some() {
            subscribed += 1;
        }
    }
    subscribed
}

/// Dispatch the batch and wait until the queue is idle.
pub async fn run(queue: &Queue<u64>, plan: &RunPlan) -> RunSummary {
    let started = Instant::now();
    info!(
        tasks = plan.tasks,
        fail_every = plan.fail_every,
        flaky_every = plan.flaky_every,
        detach_every = plan.detach_every,
        "Dispatching batch"
    );

    let handles: Vec<_> = (1..=plan.tasks)
        .map(|index| {
            let attempts = Arc::new(AtomicU32::new(0));
            let fails = plan.fails(index);
            let flaky = plan.is_flaky(index);
            let work = plan.work;

            queue
                .dispatch(move |resolve, reject| {
                    let attempts = attempts.clone();
                    async move {
                        let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                        if !work.is_zero() {
                            tokio::time::sleep(work).await;
                        }
                        if fails {
                            reject.reject(format!("task {index} failed"));
                        } else if flaky && attempt == 0 {
                            reject.reject(format!("task {index} failed on first attempt"));
                        } else {
                            resolve.resolve(index);
                        }
                        Ok(())
                    }
                })
                .with(plan.options(index))
                .submit()
        })
        .collect();

    let outcomes = join_all(handles).await;
    queue.idle().await;

    let mut summary = RunSummary {
        tasks: plan.tasks,
        resolved: 0,
        failed: 0,
        total: 0,
        elapsed_ms: 0,
        errors: Vec::new(),
        metrics: queue.metrics(),
        statistics: queue.statistics(),
    };
    for outcome in outcomes {
        match outcome {
            Ok(value) => {
                summary.resolved += 1;
                summary.total += value;
            }
            Err(error) => {
                summary.failed += 1;
                summary.errors.push(error.to_string());
            }
        }
    }
    summary.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    info!(
        resolved = summary.resolved,
        failed = summary.failed,
        cycles = summary.metrics.cycles,
        elapsed_ms = summary.elapsed_ms,
        "Batch finished"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_predicates() {
        let plan = RunPlan {
            tasks: 12,
            fail_every: 4,
            flaky_every: 2,
            detach_every: 3,
            ..Default::default()
        };
        assert!(plan.fails(8));
        assert!(!plan.is_flaky(8));
        assert!(plan.is_flaky(6));
        assert!(plan.is_detached(6));
        assert!(!plan.fails(1) && !plan.is_flaky(1) && !plan.is_detached(1));
    }

    #[test]
    fn test_zero_disables() {
        let plan = RunPlan::default();
        assert!(!plan.fails(5));
        assert!(!plan.is_flaky(5));
        assert!(!plan.is_detached(5));
    }

    #[test]
    fn test_observe_respects_allow_list() {
        let queue: Queue<u64> = Queue::new();
        assert_eq!(observe(&queue, &EventBusConfig::default()), 3);

        let other: Queue<u64> = Queue::new();
        assert_eq!(observe(&other, &EventBusConfig::restricted(["error"])), 1);
        assert!(!other.events().has_subscription(LifecycleEvent::QueueStart, None));
    }

    #[tokio::test]
    async fn test_run_all_succeed() {
        let queue: Queue<u64> = Queue::new();
        let plan = RunPlan {
            tasks: 5,
            ..Default::default()
        };
        let summary = run(&queue, &plan).await;

        assert_eq!(summary.resolved, 5);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.total, 15);
        assert_eq!(summary.metrics.tasks_started, 5);
        assert_eq!(summary.metrics.succeeded, 5);
    }

    #[tokio::test]
    async fn test_run_with_failures_and_retries() {
        let queue: Queue<u64> = Queue::new();
        observe(&queue, &EventBusConfig::default());
        let plan = RunPlan {
            tasks: 6,
            fail_every: 3,
            flaky_every: 2,
            retries: Some(1),
            ..Default::default()
        };
        let summary = run(&queue, &plan).await;

        // 3 and 6 always fail; 2 and 4 recover on retry.
        assert_eq!(summary.resolved, 4);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.total, 1 + 2 + 4 + 5);
        assert_eq!(summary.metrics.failures, 6);
        assert_eq!(summary.metrics.dropped, 2);
        assert_eq!(summary.statistics.emit_errors_count, 0);
    }

    #[tokio::test]
    async fn test_flaky_without_retry_fails() {
        let queue: Queue<u64> = Queue::new();
        let plan = RunPlan {
            tasks: 2,
            flaky_every: 2,
            detach_every: 1,
            ..Default::default()
        };
        let summary = run(&queue, &plan).await;

        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.errors, vec!["task 2 failed on first attempt".to_string()]);
        assert_eq!(summary.metrics.detached, 2);
    }
}
