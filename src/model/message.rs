//! Message definitions
//!
//! `Message` is the unit handed between transport, router and sinks. It is an
//! immutable value: the channel is fixed at construction and the payload is
//! opaque text to everything except the codec.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    channel: String,
    payload: String,
}

impl Message {
    pub fn new(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }

    /// The routing key.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Re-address the payload onto another channel, producing a new message.
    pub fn readdressed(&self, channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            payload: self.payload.clone(),
        }
    }
}
