mod settings;

use crate::config::settings::PartialSettings;
use crate::utils::error::GatewayError;
use config::{Config, ConfigError, Environment, File};

pub use settings::{
    Backend, DeviceSettings, GatewaySettings, LoggingSettings, PersistenceSettings,
    PublisherSettings, Settings,
};

/// Environment variables are read as `GWROUTE__<SECTION>__<KEY>`.
pub const ENV_PREFIX: &str = "GWROUTE";
pub const ENV_SEPARATOR: &str = "__";

/// Loads the configuration from `.env`, the default file and environment
/// variables, merged over the default values.
pub fn load_config() -> Result<Settings, ConfigError> {
    dotenvy::dotenv().ok();

    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;
    let default = Settings::default();

    Ok(Settings {
        gateway: GatewaySettings {
            key: partial
                .gateway
                .as_ref()
                .and_then(|g| g.key.clone())
                .unwrap_or(default.gateway.key),
        },
        publisher: PublisherSettings {
            batch_size: partial
                .publisher
                .as_ref()
                .and_then(|p| p.batch_size)
                .unwrap_or(default.publisher.batch_size),
        },
        persistence: PersistenceSettings {
            backend: partial
                .persistence
                .as_ref()
                .and_then(|p| p.backend)
                .unwrap_or(default.persistence.backend),
            path: partial
                .persistence
                .as_ref()
                .and_then(|p| p.path.clone())
                .unwrap_or(default.persistence.path),
        },
        logging: LoggingSettings {
            level: partial
                .logging
                .as_ref()
                .and_then(|l| l.level.clone())
                .unwrap_or(default.logging.level),
        },
        devices: partial.devices.unwrap_or(default.devices),
    })
}

impl Settings {
    /// Rejects settings the router cannot work with.
    pub fn validate(&self) -> Result<(), GatewayError> {
        check_key("gateway.key", &self.gateway.key)?;
        if self.publisher.batch_size == 0 {
            return Err(GatewayError::InvalidSetting(
                "publisher.batch_size must be at least 1".to_string(),
            ));
        }
        for device in &self.devices {
            check_key("devices.key", &device.key)?;
            if device.key == self.gateway.key {
                return Err(GatewayError::InvalidSetting(format!(
                    "device '{}' uses the gateway's own key",
                    device.key
                )));
            }
        }
        Ok(())
    }
}

fn check_key(setting: &str, key: &str) -> Result<(), GatewayError> {
    if key.is_empty() || key.contains('/') {
        return Err(GatewayError::InvalidSetting(format!(
            "{setting} '{key}' must be non-empty and contain no '/'"
        )));
    }
    Ok(())
}
