//! Queue errors.

use std::any::Any;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure value of a task.
///
/// Delivered to `on_error` callbacks, to `error` event subscribers and to
/// [`TaskHandle`](crate::TaskHandle) awaiters.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TaskError {
    /// The work rejected, or returned an error.
    #[error("{0}")]
    Rejected(String),

    /// The work panicked.
    #[error("Task panicked: {0}")]
    Panicked(String),

    /// The task finished without resolving or rejecting.
    #[error("Task finished without resolving or rejecting")]
    Abandoned,
}

impl TaskError {
    /// Create a rejection with the given message.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Panicked(message)
    }
}

impl From<&str> for TaskError {
    fn from(message: &str) -> Self {
        Self::Rejected(message.to_string())
    }
}

impl From<String> for TaskError {
    fn from(message: String) -> Self {
        Self::Rejected(message)
    }
}

impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        Self::Rejected(format!("{:#}", err))
    }
}

/// Queue construction errors.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Retry limit above the configured maximum.
    #[error("Retry limit {requested} exceeds maximum {max}")]
    RetryLimitExceeded { requested: u32, max: u32 },
}
