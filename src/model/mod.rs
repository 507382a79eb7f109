//! The `model` module holds the values that travel through the gateway:
//! the immutable `Message` and the domain shapes the codec turns into
//! payloads (readings, alarms, actuator status, configuration) or parses out
//! of inbound commands.

pub mod data;
pub mod message;

pub use data::{
    ActuatorGetCommand, ActuatorSetCommand, ActuatorState, ActuatorStatus, Alarm,
    ConfigurationGetCommand, ConfigurationItem, SensorReading,
};
pub use message::Message;
