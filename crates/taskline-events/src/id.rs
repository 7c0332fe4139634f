//! Identifier sources for tasks and subscriptions.
//!
//! Identifiers only need to be unique enough for bookkeeping within one
//! process lifetime. They are never used for lookup across processes and
//! carry no cryptographic guarantee.
//!
//! Each bus and queue owns its own [`IdSource`], so there is no
//! process-wide counter and tests can substitute [`SequentialIds`].

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Counter value after which [`IdGenerator`] wraps back to 1.
pub const COUNTER_WRAP: u64 = 1_000_000;

/// Source of string identifiers.
pub trait IdSource: Send + Sync {
    /// Produce the next identifier.
    fn next_id(&self) -> String;
}

/// Random-plus-counter identifier generator.
///
/// Every value is eight random decimal digits followed by a counter that
/// increases on each call and wraps after [`COUNTER_WRAP`].
#[derive(Debug, Default)]
pub struct IdGenerator {
    counter: AtomicU64,
}

impl IdGenerator {
    /// Create a generator with its counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_count(&self) -> u64 {
        let previous = self
            .counter
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                Some(if count > COUNTER_WRAP { 1 } else { count + 1 })
            })
            .unwrap_or_default();
        if previous > COUNTER_WRAP { 1 } else { previous + 1 }
    }
}

impl IdSource for IdGenerator {
    fn next_id(&self) -> String {
        let fraction: f64 = rand::random();
        let digits = (fraction * 100_000_000.0) as u64;
        format!("{:08}{}", digits, self.next_count())
    }
}

impl Iterator for IdGenerator {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        Some(self.next_id())
    }
}

/// Deterministic identifiers: `{prefix}-1`, `{prefix}-2`, ...
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIds {
    /// Create a sequence with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdSource for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", self.prefix, n)
    }
}

/// UUIDv4 identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
