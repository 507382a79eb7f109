//! The `persistence` module holds the backlog: values waiting to be published
//! to the platform, keyed by reference.
//!
//! Two retention policies exist. Readings and alarms queue up per key and come
//! out in insertion order (`Retention::Fifo`). Actuator status and
//! configuration keep only the newest unpublished value per key
//! (`Retention::LastValue`). Across keys there is no ordering.
//!
//! `MemoryStore` is the reference implementation and loses everything on a
//! crash. `SledStore` keeps the same contracts on disk.

pub mod memory_store;
pub mod sled_store;

use std::collections::BTreeSet;

pub use memory_store::MemoryStore;
pub use sled_store::SledStore;

/// How `put` treats a key that already has pending values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Append behind the pending values.
    Fifo,
    /// Replace the pending value.
    LastValue,
}

/// Capability set of a per-key backlog.
///
/// Implementations are not synchronized; the publisher's outbox owns them
/// behind its lock. `peek_first_n` and `remove_first_n` hand back or drop
/// fewer than `n` values when fewer are pending.
pub trait BacklogStore<V>: Send {
    fn retention(&self) -> Retention;

    fn put(&mut self, key: &str, value: V);

    fn peek_first_n(&self, key: &str, n: usize) -> Vec<V>;

    fn remove_first_n(&mut self, key: &str, n: usize);

    fn keys_with_backlog(&self) -> BTreeSet<String>;

    fn is_empty(&self) -> bool;

    /// Number of values pending for `key`.
    fn len(&self, key: &str) -> usize;

    /// Oldest pending value for `key`. For last-value stores, the only one.
    fn get(&self, key: &str) -> Option<V> {
        self.peek_first_n(key, 1).into_iter().next()
    }
}
