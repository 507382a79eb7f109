//! The `protocol` module is the topic codec: a stateless set of functions over
//! the channel grammar (`channel`), its literal table (`grammar`) and the JSON
//! payload shapes (`payload`).
//!
//! Nothing here holds state or performs I/O, so every function may be called
//! from any thread. Parse, validate and transform functions never fail loudly:
//! they answer with `bool`, `Option`, an empty string or a typed error value.

pub mod channel;
pub mod grammar;
pub mod payload;

pub use channel::{
    AddressDepth, Addressing, ChannelAddress, build, classify, collapse_device_to_gateway,
    expand_gateway_to_device, is_actuator_get_request, is_actuator_set_request,
    is_actuator_status_message, is_alarm_message, is_configuration_get_request,
    is_configuration_response, is_configuration_set_request, is_message_from_platform,
    is_message_to_platform, is_sensor_reading_message, parse_device_key, parse_reference,
    to_device_addressing, to_gateway_then_device_addressing,
};
pub use grammar::{Direction, MessageKind};

use crate::model::{ActuatorStatus, Alarm, ConfigurationItem, Message, SensorReading};
use crate::utils::error::BuildError;

/// Builds a `d2p` channel and checks it parses back.
fn outbound_channel(
    kind: MessageKind,
    addressing: &Addressing,
    reference: &str,
) -> Result<String, BuildError> {
    let channel = build(Direction::DeviceToPlatform, kind, addressing, reference);
    ChannelAddress::parse(&channel)?;
    Ok(channel)
}

/// One message carrying a batch of readings for `reference`.
pub fn readings_message(
    addressing: &Addressing,
    reference: &str,
    readings: &[SensorReading],
) -> Result<Message, BuildError> {
    let channel = outbound_channel(MessageKind::SensorReading, addressing, reference)?;
    Ok(Message::new(channel, payload::serialize_readings(readings)?))
}

pub fn alarms_message(
    addressing: &Addressing,
    reference: &str,
    alarms: &[Alarm],
) -> Result<Message, BuildError> {
    let channel = outbound_channel(MessageKind::Alarm, addressing, reference)?;
    Ok(Message::new(channel, payload::serialize_alarms(alarms)?))
}

pub fn actuator_status_message(
    addressing: &Addressing,
    status: &ActuatorStatus,
) -> Result<Message, BuildError> {
    let channel = outbound_channel(MessageKind::ActuatorStatus, addressing, &status.reference)?;
    Ok(Message::new(
        channel,
        payload::serialize_actuator_status(status)?,
    ))
}

pub fn configuration_message(
    addressing: &Addressing,
    item: &ConfigurationItem,
) -> Result<Message, BuildError> {
    let channel = outbound_channel(MessageKind::ConfigurationGet, addressing, &item.key)?;
    Ok(Message::new(channel, payload::serialize_configuration(item)?))
}

#[cfg(test)]
mod tests;
