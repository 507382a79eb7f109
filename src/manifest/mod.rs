//! The `manifest` module is the lookup boundary for attached devices.
//!
//! A device is "bound" to the gateway when `ManifestRepository::resolve`
//! returns a manifest for its key. The router uses the manifest only to check
//! that a reference a device publishes on was declared for that device.

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock};

use serde::Deserialize;

use crate::protocol::MessageKind;

/// The references a device declared, grouped by what they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeviceManifest {
    pub sensors: BTreeSet<String>,
    pub alarms: BTreeSet<String>,
    pub actuators: BTreeSet<String>,
    pub configurations: BTreeSet<String>,
}

impl DeviceManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sensor(mut self, reference: impl Into<String>) -> Self {
        self.sensors.insert(reference.into());
        self
    }

    pub fn with_alarm(mut self, reference: impl Into<String>) -> Self {
        self.alarms.insert(reference.into());
        self
    }

    pub fn with_actuator(mut self, reference: impl Into<String>) -> Self {
        self.actuators.insert(reference.into());
        self
    }

    pub fn with_configuration(mut self, reference: impl Into<String>) -> Self {
        self.configurations.insert(reference.into());
        self
    }

    /// Whether `reference` is declared for messages of `kind`.
    ///
    /// Readings must name a sensor, events an alarm, actuator traffic an
    /// actuator and configuration traffic a configuration item.
    pub fn declares(&self, kind: MessageKind, reference: &str) -> bool {
        let declared = match kind {
            MessageKind::SensorReading => &self.sensors,
            MessageKind::Alarm => &self.alarms,
            MessageKind::ActuatorStatus | MessageKind::ActuatorSet | MessageKind::ActuatorGet => {
                &self.actuators
            }
            MessageKind::ConfigurationSet | MessageKind::ConfigurationGet => &self.configurations,
        };
        declared.contains(reference)
    }

    /// Every declared reference.
    pub fn references(&self) -> BTreeSet<&str> {
        self.sensors
            .iter()
            .chain(&self.alarms)
            .chain(&self.actuators)
            .chain(&self.configurations)
            .map(String::as_str)
            .collect()
    }
}

pub trait ManifestRepository: Send + Sync {
    fn resolve(&self, device_key: &str) -> Option<DeviceManifest>;
}

/// Manifests held in memory, bound and unbound at runtime.
#[derive(Debug, Default)]
pub struct InMemoryManifestRepository {
    devices: RwLock<HashMap<String, DeviceManifest>>,
}

impl InMemoryManifestRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, device_key: impl Into<String>, manifest: DeviceManifest) {
        self.devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(device_key.into(), manifest);
    }

    pub fn unbind(&self, device_key: &str) -> Option<DeviceManifest> {
        self.devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(device_key)
    }

    pub fn len(&self) -> usize {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ManifestRepository for InMemoryManifestRepository {
    fn resolve(&self, device_key: &str) -> Option<DeviceManifest> {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(device_key)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declares_is_kind_aware() {
        let manifest = DeviceManifest::new()
            .with_sensor("T")
            .with_alarm("HOT")
            .with_actuator("SW")
            .with_configuration("HB");

        assert!(manifest.declares(MessageKind::SensorReading, "T"));
        assert!(!manifest.declares(MessageKind::Alarm, "T"));
        assert!(manifest.declares(MessageKind::Alarm, "HOT"));
        assert!(manifest.declares(MessageKind::ActuatorStatus, "SW"));
        assert!(manifest.declares(MessageKind::ConfigurationGet, "HB"));
        assert!(!manifest.declares(MessageKind::SensorReading, "UNKNOWN"));
    }

    #[test]
    fn test_references_lists_everything() {
        let manifest = DeviceManifest::new().with_sensor("T").with_actuator("SW");
        let refs: Vec<&str> = manifest.references().into_iter().collect();
        assert_eq!(refs, vec!["SW", "T"]);
    }

    #[test]
    fn test_bind_resolve_unbind() {
        let repo = InMemoryManifestRepository::new();
        assert!(repo.resolve("DEV").is_none());

        repo.bind("DEV", DeviceManifest::new().with_sensor("T"));
        assert_eq!(repo.len(), 1);
        assert!(repo.resolve("DEV").unwrap().sensors.contains("T"));

        assert!(repo.unbind("DEV").is_some());
        assert!(repo.resolve("DEV").is_none());
        assert!(repo.is_empty());
    }
}
