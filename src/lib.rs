//! # gwroute
//!
//! `gwroute` is the message-routing core of an IoT gateway. It sits between
//! locally attached devices and a remote platform, speaks a slash-delimited
//! channel grammar (`d2p/...` towards the platform, `p2d/...` towards
//! devices) and decides, for every message, whether it is handled by the
//! gateway itself, re-addressed and forwarded, or dropped.
//!
//! ## Core Modules
//!
//! - `protocol`: the stateless channel and payload codec.
//! - `router`: the routing state machine, local command dispatch and the
//!   data-entry / publish API for the gateway's own readings.
//! - `publisher`: the shared backlog and the worker thread that drains it.
//! - `persistence`: backlog stores (in memory and `sled`).
//! - `manifest`: which devices are bound and which references they declared.
//! - `transport`: the sink traits the router publishes into.
//! - `model`: message and data value types.
//! - `config`: settings loading.
//! - `utils`: logging setup and error types.

pub mod config;
pub mod manifest;
pub mod model;
pub mod persistence;
pub mod protocol;
pub mod publisher;
pub mod router;
pub mod transport;
pub mod utils;
