use super::channel::{self, AddressDepth, Addressing, ChannelAddress};
use super::grammar::{Direction, MessageKind};
use super::payload;
use crate::model::{ActuatorState, ActuatorStatus, Alarm, ConfigurationItem, SensorReading};
use crate::utils::error::{BuildError, PayloadError};
use serde_json::{Value, json};

fn as_json(s: &str) -> Value {
    serde_json::from_str(s).unwrap()
}

#[test]
fn test_parse_reference_and_device_key() {
    let ch = "d2p/sensor_reading/d/K/r/R";
    assert_eq!(channel::parse_reference(ch), "R");
    assert_eq!(channel::parse_device_key(ch), "K");
}

#[test]
fn test_parse_reference_rightmost_marker_wins() {
    let ch = "p2d/configuration_get/g/GW/r/REF/p2d/actuator_set";
    assert_eq!(channel::parse_reference(ch), "REF/p2d/actuator_set");

    assert_eq!(channel::parse_reference("d2p/events/d/K/r/a/r/b"), "b");
}

#[test]
fn test_parse_reference_strips_trailing_delimiter() {
    assert_eq!(channel::parse_reference("d2p/events/d/K/r/ALARM/"), "ALARM");
    assert_eq!(channel::parse_reference("d2p/events/d/K"), "");
}

#[test]
fn test_parse_device_key_falls_back_to_gateway() {
    assert_eq!(channel::parse_device_key("p2d/actuator_set/g/GW/r/SW"), "GW");
    assert_eq!(
        channel::parse_device_key("p2d/actuator_set/g/GW/d/DEV/r/SW"),
        "DEV"
    );
    assert_eq!(channel::parse_device_key("p2d/actuator_set/r/SW"), "");
}

#[test]
fn test_build_matches_grammar() {
    let ch = channel::build(
        Direction::PlatformToDevice,
        MessageKind::ActuatorSet,
        &Addressing::gateway_device("GW", "DEV"),
        "SW",
    );
    assert_eq!(ch, "p2d/actuator_set/g/GW/d/DEV/r/SW");

    let ch = channel::build(
        Direction::DeviceToPlatform,
        MessageKind::Alarm,
        &Addressing::device("DEV"),
        "a/b",
    );
    assert_eq!(ch, "d2p/events/d/DEV/r/a/b");
}

#[test]
fn test_parse_then_rebuild_is_byte_identical() {
    for ch in [
        "d2p/sensor_reading/d/K/r/T",
        "p2d/configuration_get/g/GW/d/DEV/r/REF",
        "p2d/actuator_get/g/GW/r/a/r/b",
    ] {
        assert_eq!(ChannelAddress::parse(ch).unwrap().to_channel(), ch);
    }
}

#[test]
fn test_classify() {
    assert_eq!(
        channel::classify("p2d/actuator_set/g/GW/r/SW"),
        Some((
            Direction::PlatformToDevice,
            MessageKind::ActuatorSet,
            AddressDepth::Gateway
        ))
    );
    assert_eq!(
        channel::classify("d2p/actuator_status/g/GW/d/DEV/r/SW"),
        Some((
            Direction::DeviceToPlatform,
            MessageKind::ActuatorStatus,
            AddressDepth::GatewayDevice
        ))
    );
    assert_eq!(
        channel::classify("d2p/events/d/DEV/r/HOT"),
        Some((
            Direction::DeviceToPlatform,
            MessageKind::Alarm,
            AddressDepth::Device
        ))
    );
}

#[test]
fn test_validators_reject_malformed_channels() {
    let bad = [
        "",
        "d2p",
        "d2p/sensor_reading",
        "x2y/sensor_reading/d/K/r/T",
        "d2p/temperature/d/K/r/T",
        "d2p/sensor_reading/r/T",
        "d2p/sensor_reading/d/K/T",
        "d2p/sensor_reading/d/K/r",
        "d2p/sensor_reading/d/K/r/",
        "d2p/sensor_reading/d//r/T",
        "d2p/sensor_reading/d/DEV/g/GW/r/T",
        "d2p/sensor_reading/d/K/r/a//b",
    ];
    for ch in bad {
        assert!(!channel::is_sensor_reading_message(ch), "accepted '{ch}'");
        assert!(!channel::is_message_to_platform(ch), "accepted '{ch}'");
        assert!(channel::classify(ch).is_none(), "classified '{ch}'");
    }
}

#[test]
fn test_validators_check_direction_and_kind() {
    let set = "p2d/actuator_set/g/GW/d/DEV/r/SW";
    assert!(channel::is_actuator_set_request(set));
    assert!(channel::is_message_from_platform(set));
    assert!(!channel::is_message_to_platform(set));
    assert!(!channel::is_actuator_get_request(set));
    assert!(!channel::is_configuration_set_request(set));

    assert!(channel::is_actuator_get_request("p2d/actuator_get/g/GW/r/SW"));
    assert!(channel::is_configuration_set_request(
        "p2d/configuration_set/g/GW/r/HB"
    ));
    assert!(channel::is_configuration_get_request(
        "p2d/configuration_get/g/GW/r/HB"
    ));
    assert!(channel::is_configuration_response("d2p/configuration_get/d/D/r/HB"));
    assert!(channel::is_alarm_message("d2p/events/d/D/r/HOT"));
    assert!(channel::is_actuator_status_message("d2p/actuator_status/d/D/r/SW"));
    assert!(!channel::is_sensor_reading_message("p2d/sensor_reading/d/D/r/T"));
}

#[test]
fn test_fixed_token_counts_still_hold_for_single_segment_references() {
    // one address pair: six tokens, both pairs: eight tokens
    assert!(channel::is_sensor_reading_message("d2p/sensor_reading/g/GW/r/T"));
    assert!(channel::is_sensor_reading_message(
        "d2p/sensor_reading/g/GW/d/D/r/T"
    ));
    assert!(!channel::is_sensor_reading_message(
        "d2p/sensor_reading/g/GW/d/D/x/y/r/T"
    ));
}

#[test]
fn test_to_device_addressing() {
    assert_eq!(
        channel::to_device_addressing("p2d/configuration_get/g/GW/d/DEV/r/REF", "GW"),
        "p2d/configuration_get/d/DEV/r/REF"
    );
    assert_eq!(
        channel::to_device_addressing("p2d/configuration_get/d/DEV/r/REF", "GW"),
        ""
    );
    assert_eq!(
        channel::to_device_addressing("p2d/configuration_get/g/OTHER/d/DEV/r/REF", "GW"),
        ""
    );
    assert_eq!(
        channel::to_device_addressing("p2d/configuration_get/g/GW/r/REF", "GW"),
        ""
    );
}

#[test]
fn test_to_gateway_then_device_addressing() {
    assert_eq!(
        channel::to_gateway_then_device_addressing("d2p/configuration_get/d/DEV/r/REF", "GW"),
        "d2p/configuration_get/g/GW/d/DEV/r/REF"
    );
    assert_eq!(
        channel::to_gateway_then_device_addressing(
            "d2p/configuration_get/g/GW/d/DEV/r/REF",
            "GW"
        ),
        ""
    );
    assert_eq!(channel::to_gateway_then_device_addressing("garbage", "GW"), "");
}

#[test]
fn test_collapse_and_expand_swap_markers() {
    assert_eq!(
        channel::collapse_device_to_gateway("d2p/sensor_reading/d/GW/r/T"),
        "d2p/sensor_reading/g/GW/r/T"
    );
    assert_eq!(
        channel::expand_gateway_to_device("p2d/actuator_set/g/GW/r/SW"),
        "p2d/actuator_set/d/GW/r/SW"
    );
    assert_eq!(
        channel::collapse_device_to_gateway("d2p/sensor_reading/g/GW/r/T"),
        ""
    );
    assert_eq!(
        channel::expand_gateway_to_device("p2d/actuator_set/g/GW/d/D/r/SW"),
        ""
    );
}

#[test]
fn test_serialize_reading_omits_unset_timestamp() {
    let untimed = payload::serialize_reading(&SensorReading::new("T", "21", 0)).unwrap();
    assert_eq!(untimed, r#"{"data":"21"}"#);

    let timed = payload::serialize_reading(&SensorReading::new("T", "21", 1500)).unwrap();
    assert_eq!(timed, r#"{"utc":1500,"data":"21"}"#);
}

#[test]
fn test_serialize_readings_batch_and_multi_value() {
    let batch = [
        SensorReading::multi_value("ACL", ["1", "2", "3"], 10),
        SensorReading::multi_value("ACL", ["4", "5", "6"], 0),
    ];
    let out = payload::serialize_readings(&batch).unwrap();
    assert_eq!(
        as_json(&out),
        json!([{"utc": 10, "data": "1,2,3"}, {"data": "4,5,6"}])
    );
}

#[test]
fn test_serialize_reading_without_values_fails() {
    let empty = SensorReading::multi_value("T", Vec::<String>::new(), 0);
    assert!(matches!(
        payload::serialize_reading(&empty),
        Err(PayloadError::Encode(_))
    ));
}

#[test]
fn test_serialize_alarms() {
    let out = payload::serialize_alarms(&[Alarm::new("HOT", true, 7), Alarm::new("HOT", false, 0)])
        .unwrap();
    assert_eq!(as_json(&out), json!([{"utc": 7, "data": "ON"}, {"data": "OFF"}]));
    assert_eq!(
        payload::serialize_alarm(&Alarm::new("HOT", false, 0)).unwrap(),
        r#"{"data":"OFF"}"#
    );
}

#[test]
fn test_serialize_actuator_status() {
    let status = ActuatorStatus::new("SW", "true", ActuatorState::Busy);
    assert_eq!(
        payload::serialize_actuator_status(&status).unwrap(),
        r#"{"status":"BUSY","value":"true"}"#
    );
}

#[test]
fn test_unrecognized_actuator_state_serializes_as_error() {
    let status = ActuatorStatus::new("SW", "1", ActuatorState::from_reported("CALIBRATING"));
    let out = as_json(&payload::serialize_actuator_status(&status).unwrap());
    assert_eq!(out["status"], "ERROR");
    assert_eq!(out["value"], "1");
}

#[test]
fn test_serialize_configuration() {
    let item = ConfigurationItem::new("LIMITS", ["1", "99"]);
    assert_eq!(
        payload::serialize_configuration(&item).unwrap(),
        r#"{"data":"1,99"}"#
    );
}

#[test]
fn test_deserialize_value() {
    assert_eq!(payload::deserialize_value(r#"{"value":"on"}"#).unwrap(), "on");
    assert_eq!(payload::deserialize_value(r#"{"value":42}"#).unwrap(), "42");
    assert_eq!(payload::deserialize_value(r#"{"value":true}"#).unwrap(), "true");
    assert_eq!(payload::deserialize_value(r#"{"other":1}"#).unwrap(), "");
    assert_eq!(payload::deserialize_value("{}").unwrap(), "");
}

#[test]
fn test_deserialize_malformed_actuator_set_fails() {
    assert!(matches!(
        payload::deserialize_actuator_set("SW", "{not json"),
        Err(PayloadError::InvalidJson(_))
    ));
    assert_eq!(
        payload::deserialize_actuator_set("SW", r#"["value"]"#),
        Err(PayloadError::NotAnObject { found: "array" })
    );
}

#[test]
fn test_deserialize_configuration_set_splits_values() {
    let item = payload::deserialize_configuration_set("LIMITS", r#"{"value":"1,99"}"#).unwrap();
    assert_eq!(item.key, "LIMITS");
    assert_eq!(item.values, vec!["1", "99"]);
}

#[test]
fn test_readings_message_targets_gateway_channel() {
    let msg = super::readings_message(
        &Addressing::gateway("GW"),
        "T",
        &[SensorReading::new("T", "20", 0)],
    )
    .unwrap();
    assert_eq!(msg.channel(), "d2p/sensor_reading/g/GW/r/T");
    assert_eq!(as_json(msg.payload()), json!([{"data": "20"}]));
}

#[test]
fn test_message_with_invalid_reference_fails_to_build() {
    let err = super::alarms_message(&Addressing::gateway("GW"), "", &[Alarm::new("", true, 0)])
        .unwrap_err();
    assert!(matches!(err, BuildError::Channel(_)));
}

#[test]
fn test_configuration_message_channel() {
    let msg = super::configuration_message(
        &Addressing::gateway("GW"),
        &ConfigurationItem::new("HB", ["10"]),
    )
    .unwrap();
    assert_eq!(msg.channel(), "d2p/configuration_get/g/GW/r/HB");
}
