//! Queue facade.

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use taskline_events::{EmitStatistics, Event, IdGenerator, IdSource, Subscriber, SubscriptionId};

use crate::builder::TaskBuilder;
use crate::config::QueueConfig;
use crate::error::{QueueError, TaskError};
use crate::executor::{QueueEventBus, TaskExecutor};
use crate::metrics::MetricsSnapshot;
use crate::settle::{Rejecter, Resolver};
use crate::task::{async_work, sync_work, WorkFn};

/// Event delivered to queue subscribers.
pub type QueueEvent = Event<TaskError>;

/// Serialized task queue producing values of type `T`.
///
/// Tasks run one at a time in submission order. Clones share the same
/// executor and lifecycle bus.
///
/// ```rust
/// use taskline_queue::{Queue, TaskOptions};
///
/// # async fn example() {
/// let queue: Queue<String> = Queue::new();
/// let value = queue
///     .dispatch_sync(|resolve, _reject| {
///         resolve.resolve("X".to_string());
///         Ok(())
///     })
///     .with(TaskOptions::new().retry_limit(2))
///     .await;
/// assert_eq!(value.as_deref(), Ok("X"));
/// # }
/// ```
pub struct Queue<T> {
    executor: TaskExecutor<T>,
    config: QueueConfig,
    ids: Arc<dyn IdSource>,
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            config: self.config.clone(),
            ids: self.ids.clone(),
        }
    }
}

impl<T: Send + 'static> Default for Queue<T> {
    fn default() -> Self {
        Self::build(QueueConfig::default(), Arc::new(IdGenerator::new()))
    }
}

impl<T: Send + 'static> Queue<T> {
    /// Create a queue with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue from validated configuration.
    pub fn with_config(config: QueueConfig) -> Result<Self, QueueError> {
        Self::with_id_source(config, Arc::new(IdGenerator::new()))
    }

    /// Create a queue drawing task and subscription ids from `ids`.
    pub fn with_id_source(config: QueueConfig, ids: Arc<dyn IdSource>) -> Result<Self, QueueError> {
        config.validate()?;
        Ok(Self::build(config, ids))
    }

    fn build(config: QueueConfig, ids: Arc<dyn IdSource>) -> Self {
        let events = Arc::new(QueueEventBus::new().with_id_source(ids.clone()));
        Self {
            executor: TaskExecutor::new(events),
            config,
            ids,
        }
    }

    /// Start building a task from async work.
    pub fn dispatch<F, Fut>(&self, work: F) -> TaskBuilder<T>
    where
        F: Fn(Resolver<T>, Rejecter<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        self.dispatch_work(async_work(work))
    }

    /// Start building a task from synchronous work.
    pub fn dispatch_sync<F>(&self, work: F) -> TaskBuilder<T>
    where
        F: Fn(Resolver<T>, Rejecter<T>) -> Result<(), TaskError> + Send + Sync + 'static,
    {
        self.dispatch_work(sync_work(work))
    }

    /// Start building a task from prepared work.
    pub fn dispatch_work(&self, work: WorkFn<T>) -> TaskBuilder<T> {
        let id = self.ids.next_id();
        debug!(task_id = %id, "Dispatching task");
        TaskBuilder::new(self.executor.clone(), id, work, self.config.base_options())
    }

    /// Subscribe a callback to `name`. Any event name is accepted.
    pub fn on<F>(&self, name: impl AsRef<str>, callback: F) -> Option<SubscriptionId>
    where
        F: Fn(&QueueEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.executor.events().subscribe(name, callback)
    }

    /// Subscribe an async [`Subscriber`] to `name`.
    pub fn subscribe<S>(&self, name: impl AsRef<str>, subscriber: S) -> Option<SubscriptionId>
    where
        S: Subscriber<TaskError, ()> + 'static,
    {
        self.executor.events().subscribe(name, subscriber)
    }

    /// Remove the subscription `id` under `name`, or all of them without an id.
    pub fn detach(&self, name: impl AsRef<str>, id: Option<&SubscriptionId>) {
        match id {
            Some(id) => self.executor.events().unsubscribe(name, id),
            None => self.executor.events().unsubscribe_all(name),
        }
    }

    /// The lifecycle event bus.
    pub fn events(&self) -> &Arc<QueueEventBus> {
        self.executor.events()
    }

    /// The underlying executor.
    pub fn executor(&self) -> &TaskExecutor<T> {
        &self.executor
    }

    /// Queue configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Lifecycle bus emission statistics.
    pub fn statistics(&self) -> EmitStatistics {
        self.executor.events().statistics()
    }

    /// Executor metrics snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.executor.metrics()
    }

    /// Tasks waiting for the next cycle.
    pub fn pending_len(&self) -> usize {
        self.executor.pending_len()
    }

    /// Whether a drain cycle is running.
    pub fn is_draining(&self) -> bool {
        self.executor.is_draining()
    }

    /// Wait until nothing is running, pending or in flight.
    pub async fn idle(&self) {
        self.executor.idle().await
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
