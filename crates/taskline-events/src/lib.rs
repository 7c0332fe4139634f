//! # Taskline Events
//!
//! Named publish/subscribe for the Taskline task queue.
//!
//! ## Features
//!
//! - Multiple ordered subscribers per event name
//! - Optional allow-list of supported event names
//! - Best-effort emission: failing subscribers are isolated and counted
//! - Emission statistics snapshots
//! - Injectable identifier sources

pub mod bus;
pub mod config;
pub mod event;
pub mod id;
pub mod stats;
pub mod subscriber;

pub use bus::{EventBus, SubscriptionId};
pub use config::EventBusConfig;
pub use event::{Event, LifecycleEvent};
pub use id::{IdGenerator, IdSource, SequentialIds, UuidIds};
pub use stats::EmitStatistics;
pub use subscriber::Subscriber;
