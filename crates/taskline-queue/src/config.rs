//! Queue configuration.

use serde::{Deserialize, Serialize};

use crate::error::QueueError;
use crate::task::TaskOptions;

/// Queue configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Retry limit for tasks that do not set one.
    #[serde(default)]
    pub default_retry_limit: u32,

    /// Whether tasks are fire-and-forget unless they say otherwise.
    #[serde(default)]
    pub default_fire_and_forget: bool,

    /// Upper bound for `default_retry_limit`. Limits set per task are not bounded.
    #[serde(default = "default_max_retry_limit")]
    pub max_retry_limit: u32,
}

fn default_max_retry_limit() -> u32 {
    100
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_retry_limit: 0,
            default_fire_and_forget: false,
            max_retry_limit: default_max_retry_limit(),
        }
    }
}

impl QueueConfig {
    /// Check that the defaults respect the bounds.
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.default_retry_limit > self.max_retry_limit {
            return Err(QueueError::RetryLimitExceeded {
                requested: self.default_retry_limit,
                max: self.max_retry_limit,
            });
        }
        Ok(())
    }

    /// Options every dispatched task starts from.
    pub fn base_options(&self) -> TaskOptions {
        TaskOptions::new()
            .fire_and_forget(self.default_fire_and_forget)
            .retry_limit(self.default_retry_limit)
    }
}
