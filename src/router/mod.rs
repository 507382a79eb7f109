//! The `router` module decides what happens to every message crossing the
//! gateway.
//!
//! Inbound, `MessageRouter::route` classifies a channel by direction, kind and
//! address depth and either calls a local command handler, or re-addresses the
//! message and hands it to the device-side or platform-side sink. Anything
//! malformed, addressed to a foreign key, or naming an undeclared reference is
//! dropped with a log line and no side effect.
//!
//! Outbound, the `add_*` calls put the gateway's own data into the outbox and
//! the `publish_*` calls (or the publish worker) drain it in batches.

pub mod engine;
pub mod handlers;

pub use engine::{DEFAULT_BATCH_SIZE, MessageRouter, RouteOutcome};
pub use handlers::CommandHandlers;
