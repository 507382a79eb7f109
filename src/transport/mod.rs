//! The `transport` module is the boundary to whatever actually moves bytes.
//!
//! The routing core never connects, retries on a timer or handles TLS itself.
//! It only needs somewhere to hand a finished `Message` (`MessageSink`) and,
//! for the platform link, a way to ask for a connection (`Transport`).
//! Connectivity edges are reported back through
//! `PublishWorker::on_connected` / `on_disconnected`.
//!
//! `console` provides the line-oriented sink the binary uses.

pub mod console;

use crate::model::Message;

/// Somewhere a finished message can be handed to.
///
/// `publish` returns `false` when the message was not accepted; the caller
/// decides whether that is retried.
pub trait MessageSink: Send + Sync {
    fn publish(&self, message: &Message) -> bool;
}

/// A sink with a connection behind it.
pub trait Transport: MessageSink {
    fn connect(&self) -> bool;

    fn disconnect(&self) {}

    fn is_connected(&self) -> bool;
}

#[cfg(test)]
mod tests;
