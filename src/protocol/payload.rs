//! Payload shapes.
//!
//! Outbound:
//! - reading / alarm: `{"data": V}` or `{"utc": T, "data": V}`, batched as a
//!   JSON array
//! - actuator status: `{"status": S, "value": V}`
//! - configuration: `{"data": V}`
//!
//! Inbound commands: `{"value": V}`.

use serde::Serialize;
use serde_json::Value;

use super::grammar::VALUE_DELIMITER;
use crate::model::{
    ActuatorSetCommand, ActuatorState, ActuatorStatus, Alarm, ConfigurationItem, SensorReading,
};
use crate::utils::error::PayloadError;

const ALARM_ON: &str = "ON";
const ALARM_OFF: &str = "OFF";

#[derive(Serialize)]
struct DataPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    utc: Option<u64>,
    data: &'a str,
}

impl<'a> DataPayload<'a> {
    fn new(timestamp: u64, data: &'a str) -> Self {
        Self {
            utc: (timestamp != 0).then_some(timestamp),
            data,
        }
    }
}

#[derive(Serialize)]
struct StatusPayload<'a> {
    status: &'static str,
    value: &'a str,
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, PayloadError> {
    serde_json::to_string(value).map_err(|e| PayloadError::Encode(e.to_string()))
}

fn joined_values(values: &[String], what: &str, reference: &str) -> Result<String, PayloadError> {
    if values.is_empty() {
        return Err(PayloadError::Encode(format!(
            "{what} '{reference}' has no values"
        )));
    }
    Ok(values.join(VALUE_DELIMITER))
}

/// Wire name of an actuator state. Anything unrecognized goes out as `ERROR`.
pub fn actuator_state_name(state: &ActuatorState) -> &'static str {
    match state {
        ActuatorState::Ready => "READY",
        ActuatorState::Busy => "BUSY",
        ActuatorState::Error | ActuatorState::Unknown(_) => "ERROR",
    }
}

pub fn serialize_reading(reading: &SensorReading) -> Result<String, PayloadError> {
    let data = joined_values(&reading.values, "reading", &reading.reference)?;
    encode(&DataPayload::new(reading.timestamp, &data))
}

/// A batch of readings for one reference, oldest first.
pub fn serialize_readings(readings: &[SensorReading]) -> Result<String, PayloadError> {
    let joined = readings
        .iter()
        .map(|r| joined_values(&r.values, "reading", &r.reference).map(|d| (r.timestamp, d)))
        .collect::<Result<Vec<_>, _>>()?;
    let batch: Vec<DataPayload<'_>> = joined
        .iter()
        .map(|(timestamp, data)| DataPayload::new(*timestamp, data))
        .collect();
    encode(&batch)
}

fn alarm_data(alarm: &Alarm) -> &'static str {
    if alarm.active { ALARM_ON } else { ALARM_OFF }
}

pub fn serialize_alarm(alarm: &Alarm) -> Result<String, PayloadError> {
    encode(&DataPayload::new(alarm.timestamp, alarm_data(alarm)))
}

pub fn serialize_alarms(alarms: &[Alarm]) -> Result<String, PayloadError> {
    let batch: Vec<DataPayload<'_>> = alarms
        .iter()
        .map(|a| DataPayload::new(a.timestamp, alarm_data(a)))
        .collect();
    encode(&batch)
}

pub fn serialize_actuator_status(status: &ActuatorStatus) -> Result<String, PayloadError> {
    encode(&StatusPayload {
        status: actuator_state_name(&status.state),
        value: &status.value,
    })
}

pub fn serialize_configuration(item: &ConfigurationItem) -> Result<String, PayloadError> {
    let data = joined_values(&item.values, "configuration", &item.key)?;
    encode(&DataPayload::new(0, &data))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reads `"value"` from an inbound command payload.
///
/// A missing field yields an empty string; non-string scalars come back as
/// their JSON text. Anything that is not a JSON object is an error.
pub fn deserialize_value(payload: &str) -> Result<String, PayloadError> {
    let parsed: Value = serde_json::from_str(payload)?;
    let Value::Object(fields) = parsed else {
        return Err(PayloadError::NotAnObject {
            found: json_type(&parsed),
        });
    };
    Ok(match fields.get("value") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    })
}

pub fn deserialize_actuator_set(
    reference: &str,
    payload: &str,
) -> Result<ActuatorSetCommand, PayloadError> {
    Ok(ActuatorSetCommand {
        reference: reference.to_string(),
        value: deserialize_value(payload)?,
    })
}

/// Multi-value configuration arrives joined with `,`.
pub fn deserialize_configuration_set(
    reference: &str,
    payload: &str,
) -> Result<ConfigurationItem, PayloadError> {
    let value = deserialize_value(payload)?;
    let values: Vec<String> = if value.is_empty() {
        vec![String::new()]
    } else {
        value.split(VALUE_DELIMITER).map(str::to_string).collect()
    };
    Ok(ConfigurationItem::new(reference, values))
}
