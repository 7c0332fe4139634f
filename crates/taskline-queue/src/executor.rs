//! Serialized task executor.
//!
//! The executor owns a FIFO of pending tasks and a draining flag, guarded
//! together. Submitting to an idle executor starts a drain cycle on the
//! current Tokio runtime:
//!
//! ```text
//! submit ──► pending ──► [cycle] take whole batch
//!                          emit queue-start
//!                          run each task in order (fire-and-forget: spawn, don't wait)
//!                          emit queue-end
//!                          pending empty? ── yes ──► clear flag
//!                                └── no ──► next cycle
//! ```
//!
//! Tasks submitted while a cycle runs (including retries) land in the
//! pending collection and run in a later cycle, never in the current batch.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::pin::pin;
use std::sync::{Arc, OnceLock};

use futures::future::{self, FutureExt};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, error, warn};

use taskline_events::{EventBus, LifecycleEvent};

use crate::error::TaskError;
use crate::metrics::{ExecutorMetrics, MetricsSnapshot};
use crate::settle::{Attempt, Rejecter, Resolver};
use crate::task::Task;

/// Event bus carrying task lifecycle events.
pub type QueueEventBus = EventBus<TaskError, ()>;

struct ExecutorState<T> {
    pending: VecDeque<Arc<Task<T>>>,
    draining: bool,
    /// Fire-and-forget work and late rejections still running.
    in_flight: usize,
}

impl<T> ExecutorState<T> {
    fn is_idle(&self) -> bool {
        !self.draining && self.pending.is_empty() && self.in_flight == 0
    }
}

pub(crate) struct ExecutorInner<T> {
    state: Mutex<ExecutorState<T>>,
    events: Arc<QueueEventBus>,
    metrics: ExecutorMetrics,
    idle: Notify,
    /// Runtime that drain cycles and late pipelines are spawned on.
    runtime: OnceLock<Handle>,
}

impl<T> ExecutorInner<T> {
    /// The current runtime if there is one, else the first one seen.
    fn runtime(&self) -> Option<Handle> {
        match Handle::try_current() {
            Ok(handle) => Some(self.runtime.get_or_init(|| handle).clone()),
            Err(_) => self.runtime.get().cloned(),
        }
    }

    pub(crate) fn record_success(&self) {
        self.metrics.record_success();
    }
}

impl<T: Send + 'static> ExecutorInner<T> {
    fn enqueue(self: &Arc<Self>, task: Arc<Task<T>>) {
        let start = {
            let mut state = self.state.lock();
            state.pending.push_back(task);
            !std::mem::replace(&mut state.draining, true)
        };
        if !start {
            return;
        }

        match self.runtime() {
            Some(handle) => {
                handle.spawn(self.clone().drain());
            }
            None => {
                error!("Task submitted before any Tokio runtime was seen; it stays pending until the next submission");
                self.state.lock().draining = false;
            }
        }
    }

    async fn drain(self: Arc<Self>) {
        loop {
            let batch: Vec<Arc<Task<T>>> = self.state.lock().pending.drain(..).collect();

            self.metrics.record_cycle();
            debug!(tasks = batch.len(), "Drain cycle started");
            self.events.emit(LifecycleEvent::QueueStart, None).await;

            for task in batch {
                self.run(task).await;
            }

            self.events.emit(LifecycleEvent::QueueEnd, None).await;
            debug!("Drain cycle finished");

            if self.finish_cycle() {
                break;
            }
        }
    }

    /// Clear the draining flag unless more work arrived. True if the loop should stop.
    fn finish_cycle(&self) -> bool {
        let idle = {
            let mut state = self.state.lock();
            if !state.pending.is_empty() {
                return false;
            }
            state.draining = false;
            state.is_idle()
        };
        if idle {
            self.idle.notify_waiters();
        }
        true
    }

    async fn run(self: &Arc<Self>, task: Arc<Task<T>>) {
        self.metrics.record_task_started();
        debug!(task_id = task.id(), attempt = task.attempt(), "Running task");

        let attempt = Attempt::new();
        let resolver = Resolver::new(task.clone(), attempt.clone(), Arc::downgrade(self));
        let rejecter = Rejecter::new(task.clone(), attempt.clone(), Arc::downgrade(self));
        let work = task.work.clone();

        let future = match std::panic::catch_unwind(AssertUnwindSafe(|| work(resolver, rejecter))) {
            Ok(future) => AssertUnwindSafe(future)
                .catch_unwind()
                .map(|outcome| outcome.unwrap_or_else(|payload| Err(TaskError::from_panic(payload))))
                .boxed(),
            Err(payload) => future::ready(Err(TaskError::from_panic(payload))).boxed(),
        };

        let detached = if task.is_fire_and_forget() {
            self.runtime()
        } else {
            None
        };
        let inner = self.clone();
        let settle = async move {
            let result = future.await;
            if let Some(error) = attempt.finish(result) {
                inner.fail(task, error).await;
            }
        };

        match detached {
            Some(handle) => {
                self.metrics.record_detached();
                self.state.lock().in_flight += 1;
                let inner = self.clone();
                handle.spawn(async move {
                    settle.await;
                    inner.release_in_flight();
                });
            }
            None => settle.await,
        }
    }

    /// Error pipeline: emit `error`, notify the task, re-submit if retries remain.
    async fn fail(self: &Arc<Self>, task: Arc<Task<T>>, error: TaskError) {
        let will_retry = task.can_retry();
        self.metrics.record_failure();
        warn!(
            task_id = task.id(),
            attempt = task.attempt(),
            retry_limit = task.retry_limit(),
            error = %error,
            "Task failed"
        );

        self.events
            .emit(LifecycleEvent::Error, Some(error.clone()))
            .await;

        let reported = std::panic::catch_unwind(AssertUnwindSafe(|| {
            task.completion.fail(&error, !will_retry)
        }));
        if reported.is_err() {
            warn!(task_id = task.id(), "Task error callback panicked");
        }

        if will_retry {
            let attempt = task.advance_attempt();
            self.metrics.record_retry();
            debug!(task_id = task.id(), attempt, "Re-submitting failed task");
            self.enqueue(task);
        } else {
            self.metrics.record_dropped();
            debug!(task_id = task.id(), "Dropping task after final failure");
        }
    }

    /// Run the error pipeline for a rejection that arrived after the work returned.
    pub(crate) fn fail_detached(self: &Arc<Self>, task: Arc<Task<T>>, error: TaskError) {
        let Some(handle) = self.runtime() else {
            warn!(
                task_id = task.id(),
                error = %error,
                "Late rejection before any Tokio runtime was seen; discarding"
            );
            return;
        };

        self.state.lock().in_flight += 1;
        let inner = self.clone();
        handle.spawn(async move {
            inner.fail(task, error).await;
            inner.release_in_flight();
        });
    }

    fn release_in_flight(&self) {
        let idle = {
            let mut state = self.state.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.is_idle()
        };
        if idle {
            self.idle.notify_waiters();
        }
    }
}

/// Runs submitted tasks one at a time.
///
/// Cheap to clone; clones share the same pending collection.
pub struct TaskExecutor<T> {
    inner: Arc<ExecutorInner<T>>,
}

impl<T> Clone for TaskExecutor<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send + 'static> TaskExecutor<T> {
    /// Create an executor reporting to `events`.
    pub fn new(events: Arc<QueueEventBus>) -> Self {
        Self {
            inner: Arc::new(ExecutorInner {
                state: Mutex::new(ExecutorState {
                    pending: VecDeque::new(),
                    draining: false,
                    in_flight: 0,
                }),
                events,
                metrics: ExecutorMetrics::new(),
                idle: Notify::new(),
                runtime: Handle::try_current().map(OnceLock::from).unwrap_or_default(),
            }),
        }
    }

    /// Queue a task, starting a drain cycle if none is running.
    ///
    /// May be called from any thread once the executor has seen a Tokio
    /// runtime, either at construction or on an earlier submission.
    pub fn submit(&self, task: Task<T>) {
        debug!(task_id = task.id(), "Task submitted");
        self.inner.enqueue(Arc::new(task));
    }

    /// The lifecycle event bus.
    pub fn events(&self) -> &Arc<QueueEventBus> {
        &self.inner.events
    }

    /// Get a metrics snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            in_flight: self.in_flight() as u64,
            ..self.inner.metrics.snapshot()
        }
    }

    /// Tasks waiting for the next cycle.
    pub fn pending_len(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Whether a drain cycle is running.
    pub fn is_draining(&self) -> bool {
        self.inner.state.lock().draining
    }

    /// Fire-and-forget work still running.
    pub fn in_flight(&self) -> usize {
        self.inner.state.lock().in_flight
    }

    /// No cycle running, nothing pending, nothing in flight.
    pub fn is_idle(&self) -> bool {
        self.inner.state.lock().is_idle()
    }

    /// Wait until the executor is idle.
    pub async fn idle(&self) {
        loop {
            let mut notified = pin!(self.inner.idle.notified());
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
