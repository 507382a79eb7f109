//! Router engine
//!
//! Inbound decisions, keyed on (direction, address depth):
//!
//! - `p2d`, gateway only: a command for this gateway's own point, handled
//!   locally
//! - `p2d`, gateway + device: the gateway segment is stripped and the command
//!   goes to the device-side sink
//! - `p2d`, gateway + device where the device key is the gateway's own key:
//!   this is an exception to the forward-to-device rule above. The command is
//!   handled locally instead of being stripped to `d/<own>` and sent to the
//!   device-side sink
//! - `d2p`, device == own key: the gateway's own point, collapsed to gateway
//!   addressing and sent to the platform
//! - `d2p`, device == a bound device whose manifest declares the reference:
//!   the gateway segment is inserted and the message goes to the platform
//!
//! Everything else is dropped. Key checks are the isolation boundary between
//! devices and are never skipped.
//!
//! The routing decision is lock-free; only the outbox takes a lock, and never
//! while a sink is publishing.

use std::sync::Arc;

use tracing::{debug, warn};

use super::handlers::CommandHandlers;
use crate::manifest::ManifestRepository;
use crate::model::{
    ActuatorGetCommand, ActuatorSetCommand, ActuatorState, ActuatorStatus, Alarm,
    ConfigurationGetCommand, ConfigurationItem, Message, SensorReading,
};
use crate::protocol::{
    self, AddressDepth, Addressing, ChannelAddress, Direction, MessageKind, payload,
};
use crate::publisher::{DrainReport, Lane, Lanes, Outbox};
use crate::transport::MessageSink;
use crate::utils::error::{BuildError, PayloadError, RoutingError};

/// Upper bound on values packed into one outbound message.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// What `route` did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A local command handler was invoked (or its slot was empty).
    Handled(MessageKind),
    /// Re-addressed and accepted by a sink.
    Forwarded { channel: String },
    /// Not handled and not forwarded.
    Dropped(RoutingError),
}

pub struct MessageRouter {
    gateway_key: String,
    manifests: Arc<dyn ManifestRepository>,
    platform: Arc<dyn MessageSink>,
    devices: Arc<dyn MessageSink>,
    outbox: Arc<Outbox>,
    handlers: CommandHandlers,
    batch_size: usize,
}

impl MessageRouter {
    pub fn new(
        gateway_key: impl Into<String>,
        manifests: Arc<dyn ManifestRepository>,
        platform: Arc<dyn MessageSink>,
        devices: Arc<dyn MessageSink>,
        outbox: Arc<Outbox>,
    ) -> Self {
        Self {
            gateway_key: gateway_key.into(),
            manifests,
            platform,
            devices,
            outbox,
            handlers: CommandHandlers::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Maximum readings or alarms per outbound message. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn gateway_key(&self) -> &str {
        &self.gateway_key
    }

    pub fn outbox(&self) -> &Arc<Outbox> {
        &self.outbox
    }

    pub fn set_actuator_set_handler<F>(&mut self, handler: F)
    where
        F: Fn(ActuatorSetCommand) + Send + Sync + 'static,
    {
        self.handlers.actuator_set = Some(Box::new(handler));
    }

    pub fn set_actuator_get_handler<F>(&mut self, handler: F)
    where
        F: Fn(ActuatorGetCommand) + Send + Sync + 'static,
    {
        self.handlers.actuator_get = Some(Box::new(handler));
    }

    pub fn set_configuration_set_handler<F>(&mut self, handler: F)
    where
        F: Fn(ConfigurationItem) + Send + Sync + 'static,
    {
        self.handlers.configuration_set = Some(Box::new(handler));
    }

    pub fn set_configuration_get_handler<F>(&mut self, handler: F)
    where
        F: Fn(ConfigurationGetCommand) + Send + Sync + 'static,
    {
        self.handlers.configuration_get = Some(Box::new(handler));
    }

    /// Route one inbound message. Never fails; a drop is reported in the outcome.
    pub fn route(&self, message: &Message) -> RouteOutcome {
        match self.try_route(message) {
            Ok(outcome) => outcome,
            Err(err) => {
                match &err {
                    RoutingError::MalformedPayload { .. } | RoutingError::TransportFailure { .. } => {
                        debug!("Dropping message: {err}")
                    }
                    _ => warn!("Dropping message: {err}"),
                }
                RouteOutcome::Dropped(err)
            }
        }
    }

    fn try_route(&self, message: &Message) -> Result<RouteOutcome, RoutingError> {
        let channel = message.channel();
        let address = ChannelAddress::parse(channel)?;

        match address.direction {
            Direction::PlatformToDevice => self.route_from_platform(message, &address),
            Direction::DeviceToPlatform => self.route_to_platform(message, &address),
        }
    }

    fn route_from_platform(
        &self,
        message: &Message,
        address: &ChannelAddress,
    ) -> Result<RouteOutcome, RoutingError> {
        let channel = message.channel();
        if !address.kind.is_command() {
            return Err(RoutingError::malformed_channel(channel));
        }

        let gateway = address.addressing.gateway.as_deref().unwrap_or_default();
        if gateway != self.gateway_key {
            let key = address
                .addressing
                .gateway
                .as_deref()
                .or(address.addressing.device.as_deref())
                .unwrap_or_default();
            return Err(RoutingError::mismatched_key(channel, key));
        }

        match address.depth() {
            AddressDepth::Gateway => self.handle_locally(address.kind, message),
            // gateway addressed as its own device: handled here, not forwarded
            AddressDepth::GatewayDevice
                if address.addressing.device.as_deref() == Some(self.gateway_key.as_str()) =>
            {
                self.handle_locally(address.kind, message)
            }
            AddressDepth::GatewayDevice => {
                let device_channel = protocol::to_device_addressing(channel, &self.gateway_key);
                if device_channel.is_empty() {
                    return Err(RoutingError::malformed_channel(channel));
                }
                self.forward(self.devices.as_ref(), message.readdressed(device_channel))
            }
            // no gateway pair: rejected by the key check above
            AddressDepth::Device => Err(RoutingError::mismatched_key(channel, "")),
        }
    }

    fn route_to_platform(
        &self,
        message: &Message,
        address: &ChannelAddress,
    ) -> Result<RouteOutcome, RoutingError> {
        let channel = message.channel();
        if !address.kind.is_data() {
            return Err(RoutingError::malformed_channel(channel));
        }

        let device_key = match (address.depth(), address.addressing.device.as_deref()) {
            (AddressDepth::Device, Some(key)) => key,
            _ => {
                // devices may not claim gateway addressing themselves
                let key = protocol::parse_device_key(channel);
                return Err(RoutingError::mismatched_key(channel, key));
            }
        };

        if device_key == self.gateway_key {
            let own_channel = protocol::collapse_device_to_gateway(channel);
            if own_channel.is_empty() {
                return Err(RoutingError::malformed_channel(channel));
            }
            return self.forward(self.platform.as_ref(), message.readdressed(own_channel));
        }

        let manifest = self
            .manifests
            .resolve(device_key)
            .ok_or_else(|| RoutingError::mismatched_key(channel, device_key))?;

        let reference = protocol::parse_reference(channel);
        if !manifest.declares(address.kind, &reference) {
            return Err(RoutingError::ManifestMismatch {
                device_key: device_key.to_string(),
                reference,
            });
        }

        let platform_channel =
            protocol::to_gateway_then_device_addressing(channel, &self.gateway_key);
        if platform_channel.is_empty() {
            return Err(RoutingError::malformed_channel(channel));
        }
        self.forward(self.platform.as_ref(), message.readdressed(platform_channel))
    }

    fn handle_locally(
        &self,
        kind: MessageKind,
        message: &Message,
    ) -> Result<RouteOutcome, RoutingError> {
        let channel = message.channel();
        let reference = protocol::parse_reference(channel);
        let malformed_payload = |source: PayloadError| RoutingError::MalformedPayload {
            channel: channel.to_string(),
            source,
        };

        match kind {
            MessageKind::ActuatorSet => {
                let command = payload::deserialize_actuator_set(&reference, message.payload())
                    .map_err(malformed_payload)?;
                self.handlers.actuator_set(command);
            }
            MessageKind::ActuatorGet => {
                self.handlers.actuator_get(ActuatorGetCommand { reference });
            }
            MessageKind::ConfigurationSet => {
                let item = payload::deserialize_configuration_set(&reference, message.payload())
                    .map_err(malformed_payload)?;
                self.handlers.configuration_set(item);
            }
            MessageKind::ConfigurationGet => {
                self.handlers
                    .configuration_get(ConfigurationGetCommand { reference });
            }
            MessageKind::SensorReading | MessageKind::Alarm | MessageKind::ActuatorStatus => {
                return Err(RoutingError::malformed_channel(channel));
            }
        }
        debug!("Handled {kind} for '{channel}' locally");
        Ok(RouteOutcome::Handled(kind))
    }

    fn forward(
        &self,
        sink: &dyn MessageSink,
        message: Message,
    ) -> Result<RouteOutcome, RoutingError> {
        let channel = message.channel().to_string();
        if !sink.publish(&message) {
            return Err(RoutingError::TransportFailure { channel });
        }
        debug!("Forwarded '{channel}'");
        Ok(RouteOutcome::Forwarded { channel })
    }

    pub fn add_sensor_reading(&self, reference: &str, value: impl Into<String>, timestamp: u64) {
        self.add_reading(SensorReading::new(reference, value, timestamp));
    }

    /// A multi-value reading, e.g. the three axes of an accelerometer.
    pub fn add_sensor_readings<I, S>(&self, reference: &str, values: I, timestamp: u64)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_reading(SensorReading::multi_value(reference, values, timestamp));
    }

    pub fn add_reading(&self, reading: SensorReading) {
        let key = reading.reference.clone();
        self.outbox.put(Lanes::readings, &key, reading);
    }

    pub fn add_alarm(&self, reference: &str, active: bool, timestamp: u64) {
        self.outbox
            .put(Lanes::alarms, reference, Alarm::new(reference, active, timestamp));
    }

    pub fn add_actuator_status(&self, reference: &str, value: impl Into<String>, state: ActuatorState) {
        self.outbox.put(
            Lanes::statuses,
            reference,
            ActuatorStatus::new(reference, value, state),
        );
    }

    pub fn add_configuration<I, S>(&self, reference: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outbox.put(
            Lanes::configurations,
            reference,
            ConfigurationItem::new(reference, values),
        );
    }

    fn own_addressing(&self) -> Addressing {
        Addressing::gateway(self.gateway_key.clone())
    }

    pub fn publish_sensor_readings(&self) -> DrainReport {
        self.drain_readings(self.platform.as_ref(), &|| true)
    }

    pub fn publish_alarms(&self) -> DrainReport {
        self.drain_alarms(self.platform.as_ref(), &|| true)
    }

    pub fn publish_actuator_statuses(&self) -> DrainReport {
        self.drain_statuses(self.platform.as_ref(), &|| true)
    }

    pub fn publish_configuration(&self) -> DrainReport {
        self.drain_configurations(self.platform.as_ref(), &|| true)
    }

    /// Drain every lane to the platform sink.
    pub fn publish_all(&self) -> DrainReport {
        self.drain_into(self.platform.as_ref(), &|| true)
    }

    /// Drain every lane into `sink`. `gate` is asked before each publish
    /// attempt; once it answers `false` the pass ends.
    pub fn drain_into(&self, sink: &dyn MessageSink, gate: &dyn Fn() -> bool) -> DrainReport {
        let mut report = DrainReport::default();
        report.merge(self.drain_statuses(sink, gate));
        report.merge(self.drain_readings(sink, gate));
        report.merge(self.drain_alarms(sink, gate));
        report.merge(self.drain_configurations(sink, gate));
        report
    }

    fn drain_readings(&self, sink: &dyn MessageSink, gate: &dyn Fn() -> bool) -> DrainReport {
        let addressing = self.own_addressing();
        self.drain_lane(sink, gate, Lanes::readings, self.batch_size, |key, batch| {
            protocol::readings_message(&addressing, key, batch)
        })
    }

    fn drain_alarms(&self, sink: &dyn MessageSink, gate: &dyn Fn() -> bool) -> DrainReport {
        let addressing = self.own_addressing();
        self.drain_lane(sink, gate, Lanes::alarms, self.batch_size, |key, batch| {
            protocol::alarms_message(&addressing, key, batch)
        })
    }

    fn drain_statuses(&self, sink: &dyn MessageSink, gate: &dyn Fn() -> bool) -> DrainReport {
        let addressing = self.own_addressing();
        self.drain_lane(sink, gate, Lanes::statuses, 1, |_, batch| match batch.last() {
            Some(status) => protocol::actuator_status_message(&addressing, status),
            None => Err(empty_batch()),
        })
    }

    fn drain_configurations(
        &self,
        sink: &dyn MessageSink,
        gate: &dyn Fn() -> bool,
    ) -> DrainReport {
        let addressing = self.own_addressing();
        self.drain_lane(sink, gate, Lanes::configurations, 1, |_, batch| {
            match batch.last() {
                Some(item) => protocol::configuration_message(&addressing, item),
                None => Err(empty_batch()),
            }
        })
    }

    /// Per key: peek a batch, build one message, publish, remove that batch.
    /// A refused batch ends the key for this pass. A batch that cannot be
    /// built is removed so it cannot block its key forever.
    fn drain_lane<V, F>(
        &self,
        sink: &dyn MessageSink,
        gate: &dyn Fn() -> bool,
        lane: Lane<V>,
        batch_size: usize,
        make: F,
    ) -> DrainReport
    where
        V: PartialEq,
        F: Fn(&str, &[V]) -> Result<Message, BuildError>,
    {
        let _drain = self.outbox.drain_guard();
        let mut report = DrainReport::default();

        for key in self.outbox.keys_with_backlog(lane) {
            loop {
                if !gate() {
                    return report;
                }
                let batch = self.outbox.peek_first_n(lane, &key, batch_size);
                if batch.is_empty() {
                    break;
                }

                let message = match make(&key, &batch) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!("Dropping {} pending value(s) for '{key}': {e}", batch.len());
                        report.dropped += 1;
                        if !self.outbox.acknowledge(lane, &key, &batch) {
                            break;
                        }
                        continue;
                    }
                };

                if !sink.publish(&message) {
                    debug!("Publish of '{}' refused, keeping backlog", message.channel());
                    report.failed += 1;
                    break;
                }
                report.published += 1;
                if !self.outbox.acknowledge(lane, &key, &batch) {
                    // overwritten while in flight; the newer value waits for the next wake
                    break;
                }
            }
        }
        report
    }
}

fn empty_batch() -> BuildError {
    BuildError::Payload(PayloadError::Encode("empty batch".to_string()))
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("gateway_key", &self.gateway_key)
            .field("batch_size", &self.batch_size)
            .field("handlers", &self.handlers)
            .field("outbox", &self.outbox)
            .finish()
    }
}
