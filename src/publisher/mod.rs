//! The `publisher` module moves locally produced data out of the backlog.
//!
//! - `outbox`: the shared, lock-guarded backlog plus the worker's wake flags
//! - `worker`: the dedicated thread that drains the outbox to the transport
//!
//! Delivery is at-least-once and in order per reference: a batch leaves the
//! backlog only after the transport accepted it, and a refused batch blocks
//! the rest of its reference until the next wake.

pub mod outbox;
pub mod worker;

pub use outbox::{Lane, Lanes, Outbox};
pub use worker::PublishWorker;

/// What one drain pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Batches accepted by the sink and removed.
    pub published: usize,
    /// Batches refused by the sink and left in place.
    pub failed: usize,
    /// Batches that could not be turned into a message and were discarded.
    pub dropped: usize,
}

impl DrainReport {
    pub fn merge(&mut self, other: DrainReport) {
        self.published += other.published;
        self.failed += other.failed;
        self.dropped += other.dropped;
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.dropped == 0
    }
}

#[cfg(test)]
mod tests;
