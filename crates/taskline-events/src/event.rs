//! Event records and the queue lifecycle event names.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One emission instance, shared by every subscriber of that emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event<P> {
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Event name.
    pub name: String,
    /// Caller-supplied data.
    pub payload: Option<P>,
}

impl<P> Event<P> {
    /// Create an event stamped with the current time.
    pub fn new(name: impl Into<String>, payload: Option<P>) -> Self {
        Self {
            timestamp: Utc::now(),
            name: name.into(),
            payload,
        }
    }
}

/// Events emitted by the task executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleEvent {
    /// A drain cycle is starting. No payload.
    QueueStart,
    /// A drain cycle finished. No payload.
    QueueEnd,
    /// A task failed. Payload is the error value.
    Error,
}

impl LifecycleEvent {
    /// All lifecycle events.
    pub const ALL: [LifecycleEvent; 3] = [Self::QueueStart, Self::QueueEnd, Self::Error];

    /// Wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QueueStart => "queue-start",
            Self::QueueEnd => "queue-end",
            Self::Error => "error",
        }
    }
}

impl AsRef<str> for LifecycleEvent {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
