//! The `error` module defines the error types used within `gwroute`.
//!
//! None of these cross a component boundary as a fault: the router turns a
//! `RoutingError` into a dropped-message outcome, the codec reports a
//! `PayloadError` as a failed decode, and the drain path treats a transport
//! failure as something to retry on the next wake.

use thiserror::Error;

/// Why an inbound message was not handled or forwarded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// Wrong token count, direction, kind or address markers.
    #[error("malformed channel '{channel}'")]
    MalformedChannel { channel: String },

    /// The channel was fine but the payload could not be decoded.
    #[error("malformed payload on '{channel}': {source}")]
    MalformedPayload {
        channel: String,
        #[source]
        source: PayloadError,
    },

    /// The addressing key is neither this gateway nor a bound device.
    #[error("unknown or mismatched key '{key}' on '{channel}'")]
    UnknownOrMismatchedKey { channel: String, key: String },

    /// The device is bound but its manifest does not declare the reference.
    #[error("reference '{reference}' is not declared for device '{device_key}'")]
    ManifestMismatch {
        device_key: String,
        reference: String,
    },

    /// The sink refused the message. Retried by the publish worker.
    #[error("transport refused message on '{channel}'")]
    TransportFailure { channel: String },
}

impl RoutingError {
    pub fn malformed_channel(channel: impl Into<String>) -> Self {
        Self::MalformedChannel {
            channel: channel.into(),
        }
    }

    pub fn mismatched_key(channel: impl Into<String>, key: impl Into<String>) -> Self {
        Self::UnknownOrMismatchedKey {
            channel: channel.into(),
            key: key.into(),
        }
    }

    /// Returns the error type for categorization in logs.
    pub fn error_type(&self) -> &'static str {
        match self {
            RoutingError::MalformedChannel { .. } => "malformed_channel",
            RoutingError::MalformedPayload { .. } => "malformed_payload",
            RoutingError::UnknownOrMismatchedKey { .. } => "key_mismatch",
            RoutingError::ManifestMismatch { .. } => "manifest_mismatch",
            RoutingError::TransportFailure { .. } => "transport_failure",
        }
    }
}

/// Decode/encode failures of the payload codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("failed to encode payload: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for PayloadError {
    fn from(err: serde_json::Error) -> Self {
        PayloadError::InvalidJson(err.to_string())
    }
}

/// Why an outbound message could not be constructed from backlog values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error(transparent)]
    Channel(#[from] RoutingError),

    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// Failures opening or preparing a backlog store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to open sled database at '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: sled::Error,
    },

    #[error("failed to open tree '{tree}': {source}")]
    Tree {
        tree: String,
        #[source]
        source: sled::Error,
    },
}

/// Top-level errors surfaced by the binary.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("backlog store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}
