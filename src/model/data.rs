//! Domain values produced locally or parsed from platform commands.
//!
//! Timestamps are milliseconds since the UNIX epoch; `0` means "not set" and
//! is never written into a payload.

use chrono::Utc;
use serde::{Deserialize, Serialize};

fn now_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

/// One sensor reading. Multi-value sensors carry more than one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorReading {
    pub reference: String,
    pub values: Vec<String>,
    pub timestamp: u64,
}

impl SensorReading {
    pub fn new(reference: impl Into<String>, value: impl Into<String>, timestamp: u64) -> Self {
        Self {
            reference: reference.into(),
            values: vec![value.into()],
            timestamp,
        }
    }

    pub fn multi_value<I, S>(reference: impl Into<String>, values: I, timestamp: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            reference: reference.into(),
            values: values.into_iter().map(Into::into).collect(),
            timestamp,
        }
    }

    /// A single-value reading stamped with the current time.
    pub fn now(reference: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(reference, value, now_millis())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    pub reference: String,
    pub active: bool,
    pub timestamp: u64,
}

impl Alarm {
    pub fn new(reference: impl Into<String>, active: bool, timestamp: u64) -> Self {
        Self {
            reference: reference.into(),
            active,
            timestamp,
        }
    }

    pub fn now(reference: impl Into<String>, active: bool) -> Self {
        Self::new(reference, active, now_millis())
    }
}

/// Actuator state as reported by the device.
///
/// `Unknown` keeps whatever the device reported when it does not map to one
/// of the three wire states; it goes out as `ERROR`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActuatorState {
    Ready,
    Busy,
    Error,
    Unknown(String),
}

impl ActuatorState {
    /// Maps a device-reported state, case-insensitively.
    pub fn from_reported(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "READY" => ActuatorState::Ready,
            "BUSY" => ActuatorState::Busy,
            "ERROR" => ActuatorState::Error,
            _ => ActuatorState::Unknown(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorStatus {
    pub reference: String,
    pub value: String,
    pub state: ActuatorState,
}

impl ActuatorStatus {
    pub fn new(reference: impl Into<String>, value: impl Into<String>, state: ActuatorState) -> Self {
        Self {
            reference: reference.into(),
            value: value.into(),
            state,
        }
    }
}

/// A configuration value. `key` is the configuration item's reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationItem {
    pub key: String,
    pub values: Vec<String>,
}

impl ConfigurationItem {
    pub fn new<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuatorSetCommand {
    pub reference: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuatorGetCommand {
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationGetCommand {
    pub reference: String,
}
