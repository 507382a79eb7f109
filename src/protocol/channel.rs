//! Channel building, parsing, validation and re-addressing.
//!
//! Validation walks an explicit positional schema instead of comparing token
//! counts: direction, kind, then the optional `g/<key>` and `d/<key>` pairs in
//! that order, then the `r` marker and at least one reference token. With a
//! single-segment reference this accepts exactly the six-token (one address
//! pair) and eight-token (both pairs) channels.
//!
//! Every re-addressing transform uses the same strategy: parse into a
//! `ChannelAddress`, edit the address pairs, rebuild. They return an empty
//! string when the transform does not apply.

use tracing::debug;

use super::grammar::{
    ADDRESS_POS, DELIMITER, DEVICE_MARKER, DIRECTION_POS, Direction, GATEWAY_MARKER, KIND_POS,
    MessageKind, REFERENCE_MARKER,
};
use crate::utils::error::RoutingError;

/// How deep the address part of a channel goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressDepth {
    /// `g/<gatewayKey>/` only
    Gateway,
    /// `d/<deviceKey>/` only
    Device,
    /// `g/<gatewayKey>/d/<deviceKey>/`
    GatewayDevice,
}

/// The optional address pairs of a channel. At least one must be set for the
/// channel to be valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Addressing {
    pub gateway: Option<String>,
    pub device: Option<String>,
}

impl Addressing {
    pub fn gateway(key: impl Into<String>) -> Self {
        Self {
            gateway: Some(key.into()),
            device: None,
        }
    }

    pub fn device(key: impl Into<String>) -> Self {
        Self {
            gateway: None,
            device: Some(key.into()),
        }
    }

    pub fn gateway_device(gateway: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            gateway: Some(gateway.into()),
            device: Some(device.into()),
        }
    }

    pub fn depth(&self) -> Option<AddressDepth> {
        match (&self.gateway, &self.device) {
            (Some(_), None) => Some(AddressDepth::Gateway),
            (None, Some(_)) => Some(AddressDepth::Device),
            (Some(_), Some(_)) => Some(AddressDepth::GatewayDevice),
            (None, None) => None,
        }
    }
}

/// A channel broken into its grammar parts.
///
/// `reference` is everything after the positional `r` marker, which keeps a
/// rebuild byte-identical. Reading a reference out of a raw channel for
/// handlers and manifest checks goes through [`parse_reference`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelAddress {
    pub direction: Direction,
    pub kind: MessageKind,
    pub addressing: Addressing,
    pub reference: String,
}

impl ChannelAddress {
    pub fn new(
        direction: Direction,
        kind: MessageKind,
        addressing: Addressing,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            direction,
            kind,
            addressing,
            reference: reference.into(),
        }
    }

    /// Parse against the positional schema.
    pub fn parse(channel: &str) -> Result<Self, RoutingError> {
        let malformed = || RoutingError::malformed_channel(channel);
        let trimmed = channel.strip_suffix(DELIMITER).unwrap_or(channel);
        let tokens: Vec<&str> = trimmed.split(DELIMITER).collect();

        let direction = tokens
            .get(DIRECTION_POS)
            .and_then(|t| Direction::from_token(t))
            .ok_or_else(malformed)?;
        let kind = tokens
            .get(KIND_POS)
            .and_then(|t| MessageKind::from_token(t))
            .ok_or_else(malformed)?;

        let mut pos = ADDRESS_POS;
        let mut addressing = Addressing::default();
        if tokens.get(pos) == Some(&GATEWAY_MARKER) {
            addressing.gateway = Some(address_key(&tokens, pos).ok_or_else(malformed)?);
            pos += 2;
        }
        if tokens.get(pos) == Some(&DEVICE_MARKER) {
            addressing.device = Some(address_key(&tokens, pos).ok_or_else(malformed)?);
            pos += 2;
        }
        if addressing.depth().is_none() || tokens.get(pos) != Some(&REFERENCE_MARKER) {
            return Err(malformed());
        }

        let reference = &tokens[pos + 1..];
        if reference.is_empty() || reference.iter().any(|t| t.is_empty()) {
            return Err(malformed());
        }

        Ok(Self {
            direction,
            kind,
            addressing,
            reference: reference.join("/"),
        })
    }

    pub fn depth(&self) -> AddressDepth {
        // parse() refuses channels without an address pair; a hand-built
        // address without one is rendered as device depth.
        self.addressing.depth().unwrap_or(AddressDepth::Device)
    }

    pub fn to_channel(&self) -> String {
        build(self.direction, self.kind, &self.addressing, &self.reference)
    }
}

fn address_key(tokens: &[&str], marker_pos: usize) -> Option<String> {
    tokens
        .get(marker_pos + 1)
        .filter(|key| !key.is_empty())
        .map(|key| key.to_string())
}

/// Build a channel string. Inputs are taken as valid.
pub fn build(
    direction: Direction,
    kind: MessageKind,
    addressing: &Addressing,
    reference: &str,
) -> String {
    let mut channel = String::with_capacity(32 + reference.len());
    channel.push_str(direction.as_str());
    channel.push(DELIMITER);
    channel.push_str(kind.as_str());
    channel.push(DELIMITER);
    if let Some(gateway) = &addressing.gateway {
        channel.push_str(GATEWAY_MARKER);
        channel.push(DELIMITER);
        channel.push_str(gateway);
        channel.push(DELIMITER);
    }
    if let Some(device) = &addressing.device {
        channel.push_str(DEVICE_MARKER);
        channel.push(DELIMITER);
        channel.push_str(device);
        channel.push(DELIMITER);
    }
    channel.push_str(REFERENCE_MARKER);
    channel.push(DELIMITER);
    channel.push_str(reference);
    channel
}

/// Everything after the last `/r/`, once a trailing delimiter is stripped.
pub fn parse_reference(channel: &str) -> String {
    let trimmed = channel.strip_suffix(DELIMITER).unwrap_or(channel);
    let marker = "/r/";
    match trimmed.rfind(marker) {
        Some(idx) => trimmed[idx + marker.len()..].to_string(),
        None => String::new(),
    }
}

/// Key following the first `/d/`; falls back to the first `/g/`.
pub fn parse_device_key(channel: &str) -> String {
    key_after(channel, "/d/")
        .or_else(|| key_after(channel, "/g/"))
        .unwrap_or_default()
}

fn key_after(channel: &str, marker: &str) -> Option<String> {
    let start = channel.find(marker)? + marker.len();
    let rest = &channel[start..];
    let end = rest.find(DELIMITER).unwrap_or(rest.len());
    Some(rest[..end].to_string())
}

/// Direction, kind and address depth of a well-formed channel.
pub fn classify(channel: &str) -> Option<(Direction, MessageKind, AddressDepth)> {
    match ChannelAddress::parse(channel) {
        Ok(address) => Some((address.direction, address.kind, address.depth())),
        Err(err) => {
            debug!("{err}");
            None
        }
    }
}

/// True when `channel` is well formed with the given direction and kind.
pub fn matches(channel: &str, direction: Direction, kind: MessageKind) -> bool {
    match classify(channel) {
        Some((d, k, _)) if d == direction && k == kind => true,
        Some((d, k, _)) => {
            debug!(
                "channel '{channel}' is {d}/{k}, expected {}/{}",
                direction, kind
            );
            false
        }
        None => false,
    }
}

pub fn is_message_to_platform(channel: &str) -> bool {
    matches!(classify(channel), Some((Direction::DeviceToPlatform, _, _)))
}

pub fn is_message_from_platform(channel: &str) -> bool {
    matches!(classify(channel), Some((Direction::PlatformToDevice, _, _)))
}

pub fn is_sensor_reading_message(channel: &str) -> bool {
    matches(channel, Direction::DeviceToPlatform, MessageKind::SensorReading)
}

pub fn is_alarm_message(channel: &str) -> bool {
    matches(channel, Direction::DeviceToPlatform, MessageKind::Alarm)
}

pub fn is_actuator_status_message(channel: &str) -> bool {
    matches(channel, Direction::DeviceToPlatform, MessageKind::ActuatorStatus)
}

/// Current configuration values reported towards the platform.
pub fn is_configuration_response(channel: &str) -> bool {
    matches(channel, Direction::DeviceToPlatform, MessageKind::ConfigurationGet)
}

pub fn is_actuator_set_request(channel: &str) -> bool {
    matches(channel, Direction::PlatformToDevice, MessageKind::ActuatorSet)
}

pub fn is_actuator_get_request(channel: &str) -> bool {
    matches(channel, Direction::PlatformToDevice, MessageKind::ActuatorGet)
}

pub fn is_configuration_set_request(channel: &str) -> bool {
    matches(channel, Direction::PlatformToDevice, MessageKind::ConfigurationSet)
}

pub fn is_configuration_get_request(channel: &str) -> bool {
    matches(channel, Direction::PlatformToDevice, MessageKind::ConfigurationGet)
}

fn transform(channel: &str, edit: impl FnOnce(&mut Addressing) -> bool) -> String {
    let Ok(mut address) = ChannelAddress::parse(channel) else {
        debug!("cannot re-address malformed channel '{channel}'");
        return String::new();
    };
    if edit(&mut address.addressing) {
        address.to_channel()
    } else {
        String::new()
    }
}

/// Drop the `g/<gatewayKey>/` pair from a gateway+device channel.
pub fn to_device_addressing(channel: &str, gateway_key: &str) -> String {
    transform(channel, |addressing| {
        let applies = addressing.gateway.as_deref() == Some(gateway_key)
            && addressing.device.is_some();
        if applies {
            addressing.gateway = None;
        }
        applies
    })
}

/// Put `g/<gatewayKey>/` in front of the device pair of a device channel.
pub fn to_gateway_then_device_addressing(channel: &str, gateway_key: &str) -> String {
    transform(channel, |addressing| {
        let applies = addressing.depth() == Some(AddressDepth::Device) && !gateway_key.is_empty();
        if applies {
            addressing.gateway = Some(gateway_key.to_string());
        }
        applies
    })
}

/// `.../d/<key>/r/...` becomes `.../g/<key>/r/...`.
pub fn collapse_device_to_gateway(channel: &str) -> String {
    transform(channel, |addressing| {
        let applies = addressing.depth() == Some(AddressDepth::Device);
        if applies {
            addressing.gateway = addressing.device.take();
        }
        applies
    })
}

/// `.../g/<key>/r/...` becomes `.../d/<key>/r/...`.
pub fn expand_gateway_to_device(channel: &str) -> String {
    transform(channel, |addressing| {
        let applies = addressing.depth() == Some(AddressDepth::Gateway);
        if applies {
            addressing.device = addressing.gateway.take();
        }
        applies
    })
}
