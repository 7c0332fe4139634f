//! # Taskline Queue
//!
//! Serialized in-process task queue.
//!
//! ## Features
//!
//! - FIFO execution, one task at a time per drain cycle
//! - Fire-and-forget tasks that do not hold up the cycle
//! - Bounded automatic retry of failed tasks
//! - Lifecycle events (`queue-start`, `queue-end`, `error`) on an [`EventBus`](taskline_events::EventBus)
//! - Callback or `await` style completion
//! - Executor metrics and idle detection

pub mod builder;
pub mod config;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod queue;
pub mod settle;
pub mod task;

pub use builder::{TaskBuilder, TaskHandle};
pub use config::QueueConfig;
pub use error::{QueueError, TaskError};
pub use executor::{QueueEventBus, TaskExecutor};
pub use metrics::{ExecutorMetrics, MetricsSnapshot};
pub use queue::{Queue, QueueEvent};
pub use settle::{Rejecter, Resolver};
pub use task::{async_work, sync_work, Task, TaskOptions, WorkFn, WorkFuture};
