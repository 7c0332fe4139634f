//! Subscriber callbacks.

use async_trait::async_trait;

use crate::event::Event;

/// A callback registered on the [`EventBus`](crate::EventBus).
///
/// Returning `Err` (or panicking) marks the invocation as failed in the
/// bus statistics. The failure never reaches other subscribers or the
/// emitter.
#[async_trait]
pub trait Subscriber<P, V>: Send + Sync {
    /// Handle one emission.
    async fn handle(&self, event: &Event<P>) -> anyhow::Result<V>;
}

#[async_trait]
impl<P, V, F> Subscriber<P, V> for F
where
    P: Send + Sync,
    V: Send,
    F: Fn(&Event<P>) -> anyhow::Result<V> + Send + Sync,
{
    async fn handle(&self, event: &Event<P>) -> anyhow::Result<V> {
        (self)(event)
    }
}
