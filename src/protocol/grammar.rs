//! Channel grammar literals and token positions.
//!
//! `<direction>/<kind>/[g/<gatewayKey>/][d/<deviceKey>/]r/<reference...>`

use std::fmt;

pub const DELIMITER: char = '/';

pub const DEVICE_TO_PLATFORM: &str = "d2p";
pub const PLATFORM_TO_DEVICE: &str = "p2d";

pub const GATEWAY_MARKER: &str = "g";
pub const DEVICE_MARKER: &str = "d";
pub const REFERENCE_MARKER: &str = "r";

pub const SENSOR_READING: &str = "sensor_reading";
pub const EVENTS: &str = "events";
pub const ACTUATOR_STATUS: &str = "actuator_status";
pub const ACTUATOR_SET: &str = "actuator_set";
pub const ACTUATOR_GET: &str = "actuator_get";
pub const CONFIGURATION_SET: &str = "configuration_set";
pub const CONFIGURATION_GET: &str = "configuration_get";

/// Position of the direction token.
pub const DIRECTION_POS: usize = 0;
/// Position of the kind token.
pub const KIND_POS: usize = 1;
/// First position an address marker may occupy.
pub const ADDRESS_POS: usize = 2;

/// Joins multi-value readings and configuration values in payloads.
pub const VALUE_DELIMITER: &str = ",";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    DeviceToPlatform,
    PlatformToDevice,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::DeviceToPlatform => DEVICE_TO_PLATFORM,
            Direction::PlatformToDevice => PLATFORM_TO_DEVICE,
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            DEVICE_TO_PLATFORM => Some(Direction::DeviceToPlatform),
            PLATFORM_TO_DEVICE => Some(Direction::PlatformToDevice),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    SensorReading,
    Alarm,
    ActuatorStatus,
    ActuatorSet,
    ActuatorGet,
    ConfigurationSet,
    ConfigurationGet,
}

impl MessageKind {
    pub const ALL: [MessageKind; 7] = [
        MessageKind::SensorReading,
        MessageKind::Alarm,
        MessageKind::ActuatorStatus,
        MessageKind::ActuatorSet,
        MessageKind::ActuatorGet,
        MessageKind::ConfigurationSet,
        MessageKind::ConfigurationGet,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::SensorReading => SENSOR_READING,
            MessageKind::Alarm => EVENTS,
            MessageKind::ActuatorStatus => ACTUATOR_STATUS,
            MessageKind::ActuatorSet => ACTUATOR_SET,
            MessageKind::ActuatorGet => ACTUATOR_GET,
            MessageKind::ConfigurationSet => CONFIGURATION_SET,
            MessageKind::ConfigurationGet => CONFIGURATION_GET,
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        MessageKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == token)
    }

    /// Kinds the platform sends towards devices and the gateway.
    pub fn is_command(self) -> bool {
        matches!(
            self,
            MessageKind::ActuatorSet
                | MessageKind::ActuatorGet
                | MessageKind::ConfigurationSet
                | MessageKind::ConfigurationGet
        )
    }

    /// Kinds devices and the gateway send towards the platform.
    ///
    /// `configuration_get` travels both ways: a request from the platform and
    /// the current values going back up.
    pub fn is_data(self) -> bool {
        matches!(
            self,
            MessageKind::SensorReading
                | MessageKind::Alarm
                | MessageKind::ActuatorStatus
                | MessageKind::ConfigurationGet
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
