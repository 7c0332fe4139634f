//! Event bus configuration.

use serde::{Deserialize, Serialize};

/// Event bus configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBusConfig {
    /// Allow-list of event names (None = any name may be subscribed).
    #[serde(default)]
    pub supported_events: Option<Vec<String>>,
}

impl EventBusConfig {
    /// Configuration restricted to the given names.
    pub fn restricted<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            supported_events: Some(names.into_iter().map(Into::into).collect()),
        }
    }

    /// Whether `name` passes the allow-list.
    pub fn allows(&self, name: &str) -> bool {
        self.supported_events
            .as_ref()
            .is_none_or(|names| names.iter().any(|n| n == name))
    }
}
