//! Named publish/subscribe event bus.
//!
//! Subscribers are grouped by event name and invoked in the order they
//! subscribed. Emission is best-effort: a subscriber that fails (returns
//! `Err` or panics) is recorded in the [`EmitStatistics`] and skipped, the
//! remaining subscribers still run, and [`EventBus::emit`] itself never fails.
//!
//! ```rust
//! use taskline_events::{Event, EventBus};
//!
//! # async fn example() {
//! let bus: EventBus<String, usize> = EventBus::new();
//! let id = bus.subscribe("greet", |event: &Event<String>| -> anyhow::Result<usize> {
//!     Ok(event.payload.as_ref().map(|s| s.len()).unwrap_or(0))
//! });
//! assert!(id.is_some());
//!
//! let results = bus.emit("greet", Some("hello".to_string())).await;
//! assert_eq!(results, vec![5]);
//! # }
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::config::EventBusConfig;
use crate::event::Event;
use crate::id::{IdGenerator, IdSource};
use crate::stats::{EmissionOutcome, EmitStatistics, StatsRecorder};
use crate::subscriber::Subscriber;

/// Ids drawn before giving up on a source that keeps repeating itself.
const ID_DRAWS: usize = 8;

/// Identifier returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    /// Wrap a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct Subscription<P, V> {
    id: SubscriptionId,
    subscriber: Arc<dyn Subscriber<P, V>>,
}

impl<P, V> Clone for Subscription<P, V> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            subscriber: self.subscriber.clone(),
        }
    }
}

/// Event bus carrying payloads of type `P`; subscribers return `V`.
pub struct EventBus<P, V> {
    subscriptions: RwLock<HashMap<String, Vec<Subscription<P, V>>>>,
    supported_events: Option<HashSet<String>>,
    ids: Arc<dyn IdSource>,
    stats: StatsRecorder,
}

impl<P, V> Default for EventBus<P, V> {
    fn default() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            supported_events: None,
            ids: Arc::new(IdGenerator::new()),
            stats: StatsRecorder::default(),
        }
    }
}

impl<P, V> fmt::Debug for EventBus<P, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<String, usize> = self
            .subscriptions
            .read()
            .iter()
            .map(|(name, subs)| (name.clone(), subs.len()))
            .collect();
        f.debug_struct("EventBus")
            .field("subscriptions", &counts)
            .field("supported_events", &self.supported_events)
            .finish()
    }
}

impl<P, V> EventBus<P, V>
where
    P: Send + Sync,
    V: Send,
{
    /// Create a bus accepting any event name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bus from configuration.
    pub fn with_config(config: &EventBusConfig) -> Self {
        let bus = Self::default();
        match &config.supported_events {
            Some(names) => bus.with_supported_events(names.iter().cloned()),
            None => bus,
        }
    }

    /// Restrict subscriptions to the given event names.
    pub fn with_supported_events<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_events = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Use a custom identifier source for subscription ids.
    pub fn with_id_source(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    /// Whether `name` may be subscribed to.
    pub fn supports(&self, name: &str) -> bool {
        self.supported_events
            .as_ref()
            .is_none_or(|names| names.contains(name))
    }

    /// Register a subscriber under `name`.
    ///
    /// Returns `None` without registering when the bus has an allow-list
    /// that does not contain `name`, or when the identifier source cannot
    /// produce an id not already used under `name`.
    pub fn subscribe<S>(&self, name: impl AsRef<str>, subscriber: S) -> Option<SubscriptionId>
    where
        S: Subscriber<P, V> + 'static,
    {
        self.subscribe_arc(name, Arc::new(subscriber))
    }

    /// Register an already shared subscriber under `name`.
    pub fn subscribe_arc(
        &self,
        name: impl AsRef<str>,
        subscriber: Arc<dyn Subscriber<P, V>>,
    ) -> Option<SubscriptionId> {
        let name = name.as_ref();
        if !self.supports(name) {
            trace!(event = name, "Rejected subscription to unsupported event");
            return None;
        }

        let mut subscriptions = self.subscriptions.write();
        let list = subscriptions.entry(name.to_string()).or_default();
        let Some(id) = (0..ID_DRAWS)
            .map(|_| SubscriptionId(self.ids.next_id()))
            .find(|id| list.iter().all(|s| &s.id != id))
        else {
            warn!(
                event = name,
                draws = ID_DRAWS,
                "Identifier source kept repeating ids already in use; subscription refused"
            );
            return None;
        };
        list.push(Subscription {
            id: id.clone(),
            subscriber,
        });
        drop(subscriptions);

        trace!(event = name, subscription = %id, "Subscribed");
        Some(id)
    }

    /// Remove one subscription. No-op if absent.
    pub fn unsubscribe(&self, name: impl AsRef<str>, id: &SubscriptionId) {
        let mut subscriptions = self.subscriptions.write();
        if let Some(list) = subscriptions.get_mut(name.as_ref()) {
            if let Some(idx) = list.iter().position(|s| &s.id == id) {
                list.remove(idx);
            }
        }
    }

    /// Remove every subscription under `name`. No-op if absent.
    pub fn unsubscribe_all(&self, name: impl AsRef<str>) {
        self.subscriptions.write().remove(name.as_ref());
    }

    /// Whether any subscription exists under `name`, or, with `id`, that one.
    pub fn has_subscription(&self, name: impl AsRef<str>, id: Option<&SubscriptionId>) -> bool {
        let subscriptions = self.subscriptions.read();
        match subscriptions.get(name.as_ref()) {
            Some(list) if !list.is_empty() => match id {
                Some(id) => list.iter().any(|s| &s.id == id),
                None => true,
            },
            _ => false,
        }
    }

    /// Number of subscriptions under `name`.
    pub fn subscriber_count(&self, name: impl AsRef<str>) -> usize {
        self.subscriptions
            .read()
            .get(name.as_ref())
            .map_or(0, Vec::len)
    }

    /// Invoke every subscriber of `name` in order and collect the successful results.
    ///
    /// With no subscribers this returns immediately and leaves the statistics untouched.
    pub async fn emit(&self, name: impl AsRef<str>, payload: Option<P>) -> Vec<V> {
        let name = name.as_ref();
        let subscribers = {
            let subscriptions = self.subscriptions.read();
            match subscriptions.get(name) {
                Some(list) if !list.is_empty() => list.clone(),
                _ => return Vec::new(),
            }
        };

        let event = Event::new(name, payload);
        let mut results = Vec::with_capacity(subscribers.len());
        let mut outcome = EmissionOutcome::default();

        for subscription in &subscribers {
            let id = subscription.id.as_str();
            match AssertUnwindSafe(subscription.subscriber.handle(&event))
                .catch_unwind()
                .await
            {
                Ok(Ok(value)) => {
                    outcome.success(id);
                    results.push(value);
                }
                Ok(Err(e)) => {
                    trace!(event = name, subscription = id, error = %e, "Subscriber failed");
                    outcome.failure(id);
                }
                Err(_) => {
                    trace!(event = name, subscription = id, "Subscriber panicked");
                    outcome.failure(id);
                }
            }
        }

        self.stats.apply(outcome);
        results
    }

    /// Copy of the running emission statistics.
    pub fn statistics(&self) -> EmitStatistics {
        self.stats.snapshot()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
