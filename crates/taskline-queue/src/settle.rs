//! Resolve and reject handles passed to task work.
//!
//! Each attempt gets its own pair of handles sharing one [`Attempt`]. The
//! first of resolve, reject, a returned error or a panic settles the
//! attempt; anything after that is ignored and logged.
//!
//! A rejection made while the work is still running is held until the work
//! returns, so the error pipeline finishes before the executor moves on.
//! A rejection made after the work returned runs the pipeline on its own.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::TaskError;
use crate::executor::ExecutorInner;
use crate::task::Task;

#[derive(Debug, Default)]
struct AttemptState {
    settled: bool,
    finished: bool,
    held_error: Option<TaskError>,
}

/// Outcome of a reject call.
#[derive(Debug, PartialEq)]
pub(crate) enum Rejection {
    /// Held until the work returns.
    Held,
    /// The work already returned; the caller runs the pipeline.
    Late(TaskError),
    /// The attempt was already settled.
    Ignored,
}

/// Settlement state of one attempt.
#[derive(Debug, Default)]
pub(crate) struct Attempt {
    state: Mutex<AttemptState>,
}

impl Attempt {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim the attempt for a resolve. False if already settled.
    pub(crate) fn try_resolve(&self) -> bool {
        let mut state = self.state.lock();
        if state.settled {
            return false;
        }
        state.settled = true;
        true
    }

    pub(crate) fn reject(&self, error: TaskError) -> Rejection {
        let mut state = self.state.lock();
        if state.settled {
            return Rejection::Ignored;
        }
        state.settled = true;
        if state.finished {
            Rejection::Late(error)
        } else {
            state.held_error = Some(error);
            Rejection::Held
        }
    }

    /// Mark the work as returned and yield the error to report, if any.
    pub(crate) fn finish(&self, result: Result<(), TaskError>) -> Option<TaskError> {
        let mut state = self.state.lock();
        state.finished = true;
        if let Some(error) = state.held_error.take() {
            return Some(error);
        }
        match result {
            Err(error) if !state.settled => {
                state.settled = true;
                Some(error)
            }
            Err(error) => {
                debug!(error = %error, "Ignoring error from already settled task");
                None
            }
            Ok(()) => None,
        }
    }
}

/// Success continuation handed to task work.
pub struct Resolver<T> {
    task: Arc<Task<T>>,
    attempt: Arc<Attempt>,
    executor: Weak<ExecutorInner<T>>,
}

impl<T> Resolver<T> {
    pub(crate) fn new(
        task: Arc<Task<T>>,
        attempt: Arc<Attempt>,
        executor: Weak<ExecutorInner<T>>,
    ) -> Self {
        Self {
            task,
            attempt,
            executor,
        }
    }

    /// Deliver the produced value to the task's resolve callback.
    pub fn resolve(&self, value: T) {
        if !self.attempt.try_resolve() {
            warn!(task_id = self.task.id(), "Task already settled; ignoring resolve");
            return;
        }
        if let Some(executor) = self.executor.upgrade() {
            executor.record_success();
        }
        self.task.completion.resolve(value);
    }
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            task: self.task.clone(),
            attempt: self.attempt.clone(),
            executor: self.executor.clone(),
        }
    }
}

/// Failure continuation handed to task work.
pub struct Rejecter<T> {
    task: Arc<Task<T>>,
    attempt: Arc<Attempt>,
    executor: Weak<ExecutorInner<T>>,
}

impl<T: Send + 'static> Rejecter<T> {
    pub(crate) fn new(
        task: Arc<Task<T>>,
        attempt: Arc<Attempt>,
        executor: Weak<ExecutorInner<T>>,
    ) -> Self {
        Self {
            task,
            attempt,
            executor,
        }
    }

    /// Fail the task, running the error pipeline.
    pub fn reject(&self, error: impl Into<TaskError>) {
        match self.attempt.reject(error.into()) {
            Rejection::Held => {}
            Rejection::Late(error) => match self.executor.upgrade() {
                Some(executor) => executor.fail_detached(self.task.clone(), error),
                None => warn!(
                    task_id = self.task.id(),
                    error = %error,
                    "Executor dropped; discarding late rejection"
                ),
            },
            Rejection::Ignored => {
                warn!(task_id = self.task.id(), "Task already settled; ignoring reject");
            }
        }
    }
}

impl<T> Clone for Rejecter<T> {
    fn clone(&self) -> Self {
        Self {
            task: self.task.clone(),
            attempt: self.attempt.clone(),
            executor: self.executor.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_once() {
        let attempt = Attempt::default();
        assert!(attempt.try_resolve());
        assert!(!attempt.try_resolve());
        assert_eq!(attempt.reject(TaskError::from("late")), Rejection::Ignored);
    }

    #[test]
    fn test_reject_while_running_is_held() {
        let attempt = Attempt::default();
        assert_eq!(attempt.reject(TaskError::from("E")), Rejection::Held);
        assert_eq!(attempt.finish(Ok(())), Some(TaskError::from("E")));
    }

    #[test]
    fn test_held_rejection_wins_over_returned_error() {
        let attempt = Attempt::default();
        attempt.reject(TaskError::from("first"));
        assert_eq!(
            attempt.finish(Err(TaskError::from("second"))),
            Some(TaskError::from("first"))
        );
    }

    #[test]
    fn test_returned_error_settles() {
        let attempt = Attempt::default();
        assert_eq!(
            attempt.finish(Err(TaskError::from("E"))),
            Some(TaskError::from("E"))
        );
        assert!(!attempt.try_resolve());
    }

    #[test]
    fn test_returned_error_after_resolve_ignored() {
        let attempt = Attempt::default();
        assert!(attempt.try_resolve());
        assert_eq!(attempt.finish(Err(TaskError::from("E"))), None);
    }

    #[test]
    fn test_reject_after_finish_is_late() {
        let attempt = Attempt::default();
        assert_eq!(attempt.finish(Ok(())), None);
        assert_eq!(
            attempt.reject(TaskError::from("E")),
            Rejection::Late(TaskError::from("E"))
        );
        assert_eq!(attempt.reject(TaskError::from("again")), Rejection::Ignored);
    }
}
