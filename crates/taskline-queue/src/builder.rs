//! Fluent construction of dispatched tasks.
//!
//! A [`TaskBuilder`] collects options until it is finalized by one of
//! [`then`](TaskBuilder::then), [`then_ok`](TaskBuilder::then_ok),
//! [`submit`](TaskBuilder::submit) or by awaiting it directly.

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::TaskError;
use crate::executor::TaskExecutor;
use crate::task::{Task, TaskOptions, WorkFn};

/// Pending task awaiting finalization.
#[must_use = "a task builder does nothing until it is submitted"]
pub struct TaskBuilder<T> {
    executor: TaskExecutor<T>,
    id: String,
    work: WorkFn<T>,
    options: TaskOptions,
}

impl<T: Send + 'static> TaskBuilder<T> {
    pub(crate) fn new(
        executor: TaskExecutor<T>,
        id: String,
        work: WorkFn<T>,
        options: TaskOptions,
    ) -> Self {
        Self {
            executor,
            id,
            work,
            options,
        }
    }

    /// Merge options into the ones collected so far. Keys set here win.
    pub fn with(mut self, options: TaskOptions) -> Self {
        self.options = self.options.merge(options);
        self
    }

    /// ID the task will be submitted under.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Options collected so far.
    pub fn options(&self) -> TaskOptions {
        self.options
    }

    /// Submit with a resolve and an error callback.
    pub fn then<R, E>(self, on_resolve: R, on_error: E)
    where
        R: Fn(T) + Send + Sync + 'static,
        E: Fn(TaskError) + Send + Sync + 'static,
    {
        let (executor, task) = self.finalize();
        executor.submit(task.with_handlers(on_resolve, on_error));
    }

    /// Submit with only a resolve callback. Failures still reach `error` subscribers.
    pub fn then_ok<R>(self, on_resolve: R)
    where
        R: Fn(T) + Send + Sync + 'static,
    {
        let (executor, task) = self.finalize();
        executor.submit(task.with_on_resolve(on_resolve));
    }

    /// Submit and get a handle settling with the outcome.
    ///
    /// The handle fails only once retries are exhausted.
    pub fn submit(self) -> TaskHandle<T> {
        let (executor, task) = self.finalize();
        let id = task.id().to_string();
        let (task, rx) = task.deferred();
        executor.submit(task);
        TaskHandle { id, rx }
    }

    fn finalize(self) -> (TaskExecutor<T>, Task<T>) {
        let task = Task::new(self.id, self.work).with_options(&self.options);
        (self.executor, task)
    }
}

impl<T: Send + 'static> IntoFuture for TaskBuilder<T> {
    type Output = Result<T, TaskError>;
    type IntoFuture = TaskHandle<T>;

    fn into_future(self) -> Self::IntoFuture {
        self.submit()
    }
}

/// Outcome of a submitted task.
///
/// Resolves with the value passed to the resolver, or with the error of
/// the final failed attempt. If the task is dropped without settling the
/// handle yields [`TaskError::Abandoned`].
#[must_use = "dropping the handle discards the task outcome"]
pub struct TaskHandle<T> {
    id: String,
    rx: oneshot::Receiver<Result<T, TaskError>>,
}

impl<T> TaskHandle<T> {
    /// ID of the submitted task.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(TaskError::Abandoned)))
    }
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
