//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `gwroute` crate.
//!
//! It centralizes the error taxonomy shared by the codec, router and backlog,
//! and the tracing setup used by the binary and by tests.

pub mod error;
pub mod logging;
