//! Task records and options.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::TaskError;
use crate::settle::{Rejecter, Resolver};

/// Future returned by a task's work.
pub type WorkFuture = BoxFuture<'static, Result<(), TaskError>>;

/// The work a task performs.
///
/// Called once per attempt with fresh [`Resolver`] and [`Rejecter`] handles.
pub type WorkFn<T> = Arc<dyn Fn(Resolver<T>, Rejecter<T>) -> WorkFuture + Send + Sync>;

type ResolveFn<T> = Box<dyn Fn(T) + Send + Sync>;
type ErrorFn = Box<dyn Fn(TaskError) + Send + Sync>;

/// Wrap an async closure as task work.
pub fn async_work<T, F, Fut>(work: F) -> WorkFn<T>
where
    T: Send + 'static,
    F: Fn(Resolver<T>, Rejecter<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    Arc::new(move |resolve, reject| work(resolve, reject).boxed())
}

/// Wrap a synchronous closure as task work.
///
/// The closure runs to completion when the executor invokes it.
pub fn sync_work<T, F>(work: F) -> WorkFn<T>
where
    T: Send + 'static,
    F: Fn(Resolver<T>, Rejecter<T>) -> Result<(), TaskError> + Send + Sync + 'static,
{
    Arc::new(move |resolve, reject| future::ready(work(resolve, reject)).boxed())
}

/// Per-task options, merged key by key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOptions {
    /// Do not wait for the work before moving to the next task.
    #[serde(default)]
    pub fire_and_forget: Option<bool>,
    /// Automatic re-submissions after failure.
    #[serde(default)]
    pub retry_limit: Option<u32>,
}

impl TaskOptions {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fire-and-forget flag.
    pub fn fire_and_forget(mut self, enabled: bool) -> Self {
        self.fire_and_forget = Some(enabled);
        self
    }

    /// Set the retry limit.
    pub fn retry_limit(mut self, limit: u32) -> Self {
        self.retry_limit = Some(limit);
        self
    }

    /// Overlay `other` on top of `self`; keys set in `other` win.
    pub fn merge(self, other: TaskOptions) -> Self {
        Self {
            fire_and_forget: other.fire_and_forget.or(self.fire_and_forget),
            retry_limit: other.retry_limit.or(self.retry_limit),
        }
    }

    /// Effective fire-and-forget flag.
    pub fn is_fire_and_forget(&self) -> bool {
        self.fire_and_forget.unwrap_or(false)
    }

    /// Effective retry limit.
    pub fn retries(&self) -> u32 {
        self.retry_limit.unwrap_or(0)
    }
}

/// Where a task's outcome goes.
pub(crate) enum Completion<T> {
    Callbacks {
        on_resolve: ResolveFn<T>,
        on_error: Option<ErrorFn>,
    },
    Deferred(Mutex<Option<oneshot::Sender<Result<T, TaskError>>>>),
}

impl<T> Completion<T> {
    pub(crate) fn resolve(&self, value: T) {
        match self {
            Self::Callbacks { on_resolve, .. } => on_resolve(value),
            Self::Deferred(sender) => {
                if let Some(tx) = sender.lock().take() {
                    let _ = tx.send(Ok(value));
                }
            }
        }
    }

    /// Report a failure. A deferred outcome only settles on the final one.
    pub(crate) fn fail(&self, error: &TaskError, final_failure: bool) {
        match self {
            Self::Callbacks { on_error, .. } => {
                if let Some(on_error) = on_error {
                    on_error(error.clone());
                }
            }
            Self::Deferred(sender) => {
                if final_failure {
                    if let Some(tx) = sender.lock().take() {
                        let _ = tx.send(Err(error.clone()));
                    }
                }
            }
        }
    }
}

/// A unit of work submitted to the [`TaskExecutor`](crate::TaskExecutor).
///
/// Immutable once built, except for the attempt counter which only the
/// executor advances.
pub struct Task<T> {
    id: String,
    pub(crate) work: WorkFn<T>,
    pub(crate) completion: Completion<T>,
    fire_and_forget: bool,
    retry_limit: u32,
    attempt: AtomicU32,
}

impl<T: Send + 'static> Task<T> {
    /// Create a task whose resolved value is discarded.
    pub fn new(id: impl Into<String>, work: WorkFn<T>) -> Self {
        Self {
            id: id.into(),
            work,
            completion: Completion::Callbacks {
                on_resolve: Box::new(|_| {}),
                on_error: None,
            },
            fire_and_forget: false,
            retry_limit: 0,
            attempt: AtomicU32::new(0),
        }
    }

    pub(crate) fn with_callbacks<R>(mut self, on_resolve: R, on_error: Option<ErrorFn>) -> Self
    where
        R: Fn(T) + Send + Sync + 'static,
    {
        self.completion = Completion::Callbacks {
            on_resolve: Box::new(on_resolve),
            on_error,
        };
        self
    }

    /// Set the resolve callback, keeping no error callback.
    pub fn with_on_resolve<R>(self, on_resolve: R) -> Self
    where
        R: Fn(T) + Send + Sync + 'static,
    {
        self.with_callbacks(on_resolve, None)
    }

    /// Set both callbacks.
    pub fn with_handlers<R, E>(self, on_resolve: R, on_error: E) -> Self
    where
        R: Fn(T) + Send + Sync + 'static,
        E: Fn(TaskError) + Send + Sync + 'static,
    {
        self.with_callbacks(on_resolve, Some(Box::new(on_error)))
    }

    /// Set the retry limit.
    pub fn with_retry_limit(mut self, limit: u32) -> Self {
        self.retry_limit = limit;
        self
    }

    /// Set the fire-and-forget flag.
    pub fn with_fire_and_forget(mut self, enabled: bool) -> Self {
        self.fire_and_forget = enabled;
        self
    }

    /// Apply merged options.
    pub fn with_options(self, options: &TaskOptions) -> Self {
        self.with_retry_limit(options.retries())
            .with_fire_and_forget(options.is_fire_and_forget())
    }

    /// Route the outcome to a one-shot channel instead of callbacks.
    pub(crate) fn deferred(mut self) -> (Self, oneshot::Receiver<Result<T, TaskError>>) {
        let (tx, rx) = oneshot::channel();
        self.completion = Completion::Deferred(Mutex::new(Some(tx)));
        (self, rx)
    }
}

impl<T> Task<T> {
    /// Task ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the executor skips waiting for this task.
    pub fn is_fire_and_forget(&self) -> bool {
        self.fire_and_forget
    }

    /// Maximum automatic re-submissions.
    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    /// Retries performed so far.
    pub fn attempt(&self) -> u32 {
        self.attempt.load(Ordering::SeqCst)
    }

    /// Check if another failure would be retried.
    pub fn can_retry(&self) -> bool {
        self.attempt() < self.retry_limit
    }

    pub(crate) fn advance_attempt(&self) -> u32 {
        self.attempt.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("fire_and_forget", &self.fire_and_forget)
            .field("retry_limit", &self.retry_limit)
            .field("attempt", &self.attempt())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> WorkFn<u32> {
        sync_work(|_, _| Ok(()))
    }

    #[test]
    fn test_task_defaults() {
        let task = Task::new("t1", noop());
        assert_eq!(task.id(), "t1");
        assert!(!task.is_fire_and_forget());
        assert_eq!(task.retry_limit(), 0);
        assert_eq!(task.attempt(), 0);
        assert!(!task.can_retry());
    }

    #[test]
    fn test_can_retry() {
        let task = Task::new("t1", noop()).with_retry_limit(2);
        assert!(task.can_retry());
        assert_eq!(task.advance_attempt(), 1);
        assert!(task.can_retry());
        assert_eq!(task.advance_attempt(), 2);
        assert!(!task.can_retry());
    }

    #[test]
    fn test_options_merge_is_cumulative() {
        let options = TaskOptions::new()
            .retry_limit(10)
            .merge(TaskOptions::new().fire_and_forget(true));
        assert_eq!(options.retries(), 10);
        assert!(options.is_fire_and_forget());

        let overridden = options.merge(TaskOptions::new().retry_limit(1));
        assert_eq!(overridden.retries(), 1);
        assert!(overridden.is_fire_and_forget());
    }

    #[test]
    fn test_options_defaults() {
        let options = TaskOptions::default();
        assert!(!options.is_fire_and_forget());
        assert_eq!(options.retries(), 0);
    }

    #[test]
    fn test_with_options() {
        let options = TaskOptions::new().retry_limit(3).fire_and_forget(true);
        let task = Task::new("t1", noop()).with_options(&options);
        assert_eq!(task.retry_limit(), 3);
        assert!(task.is_fire_and_forget());
    }

    #[tokio::test]
    async fn test_deferred_settles_on_final_failure_only() {
        let (task, rx) = Task::new("t1", noop()).deferred();
        let error = TaskError::rejected("E");

        task.completion.fail(&error, false);
        task.completion.fail(&error, true);
        task.completion.resolve(1);

        assert_eq!(rx.await.unwrap(), Err(error));
    }

    #[tokio::test]
    async fn test_deferred_resolves() {
        let (task, rx) = Task::new("t1", noop()).deferred();
        task.completion.resolve(7);
        assert_eq!(rx.await.unwrap(), Ok(7));
    }
}
