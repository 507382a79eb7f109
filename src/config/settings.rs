use serde::Deserialize;

use crate::manifest::DeviceManifest;
use crate::router::DEFAULT_BATCH_SIZE;

/// Top-level configuration settings for the gateway.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub gateway: GatewaySettings,
    pub publisher: PublisherSettings,
    pub persistence: PersistenceSettings,
    pub logging: LoggingSettings,
    pub devices: Vec<DeviceSettings>,
}

/// Identity of this gateway on the platform.
#[derive(Debug, Deserialize, Clone)]
pub struct GatewaySettings {
    pub key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PublisherSettings {
    pub batch_size: usize,
}

/// Where the backlog lives.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Memory,
    Sled,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PersistenceSettings {
    pub backend: Backend,
    /// Database directory, used by the `sled` backend only.
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

/// A device bound to the gateway at startup, with its declared references.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct DeviceSettings {
    pub key: String,
    #[serde(default)]
    pub sensors: Vec<String>,
    #[serde(default)]
    pub alarms: Vec<String>,
    #[serde(default)]
    pub actuators: Vec<String>,
    #[serde(default)]
    pub configurations: Vec<String>,
}

impl DeviceSettings {
    pub fn manifest(&self) -> DeviceManifest {
        DeviceManifest {
            sensors: self.sensors.iter().cloned().collect(),
            alarms: self.alarms.iter().cloned().collect(),
            actuators: self.actuators.iter().cloned().collect(),
            configurations: self.configurations.iter().cloned().collect(),
        }
    }
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub gateway: Option<PartialGatewaySettings>,
    pub publisher: Option<PartialPublisherSettings>,
    pub persistence: Option<PartialPersistenceSettings>,
    pub logging: Option<PartialLoggingSettings>,
    pub devices: Option<Vec<DeviceSettings>>,
}

#[derive(Debug, Deserialize)]
pub struct PartialGatewaySettings {
    pub key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialPublisherSettings {
    pub batch_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialPersistenceSettings {
    pub backend: Option<Backend>,
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gateway: GatewaySettings {
                key: "gateway".to_string(),
            },
            publisher: PublisherSettings {
                batch_size: DEFAULT_BATCH_SIZE,
            },
            persistence: PersistenceSettings {
                backend: Backend::Memory,
                path: "data/backlog".to_string(),
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
            devices: Vec::new(),
        }
    }
}
