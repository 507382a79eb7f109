//! Callbacks for commands addressed to the gateway itself.
//!
//! One slot per command kind. An empty slot swallows the command silently.

use crate::model::{
    ActuatorGetCommand, ActuatorSetCommand, ConfigurationGetCommand, ConfigurationItem,
};

pub type ActuatorSetHandler = Box<dyn Fn(ActuatorSetCommand) + Send + Sync>;
pub type ActuatorGetHandler = Box<dyn Fn(ActuatorGetCommand) + Send + Sync>;
pub type ConfigurationSetHandler = Box<dyn Fn(ConfigurationItem) + Send + Sync>;
pub type ConfigurationGetHandler = Box<dyn Fn(ConfigurationGetCommand) + Send + Sync>;

#[derive(Default)]
pub struct CommandHandlers {
    pub(crate) actuator_set: Option<ActuatorSetHandler>,
    pub(crate) actuator_get: Option<ActuatorGetHandler>,
    pub(crate) configuration_set: Option<ConfigurationSetHandler>,
    pub(crate) configuration_get: Option<ConfigurationGetHandler>,
}

impl CommandHandlers {
    pub(crate) fn actuator_set(&self, command: ActuatorSetCommand) {
        if let Some(handler) = &self.actuator_set {
            handler(command);
        }
    }

    pub(crate) fn actuator_get(&self, command: ActuatorGetCommand) {
        if let Some(handler) = &self.actuator_get {
            handler(command);
        }
    }

    pub(crate) fn configuration_set(&self, item: ConfigurationItem) {
        if let Some(handler) = &self.configuration_set {
            handler(item);
        }
    }

    pub(crate) fn configuration_get(&self, command: ConfigurationGetCommand) {
        if let Some(handler) = &self.configuration_get {
            handler(command);
        }
    }
}

impl std::fmt::Debug for CommandHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandlers")
            .field("actuator_set", &self.actuator_set.is_some())
            .field("actuator_get", &self.actuator_get.is_some())
            .field("configuration_set", &self.configuration_set.is_some())
            .field("configuration_get", &self.configuration_get.is_some())
            .finish()
    }
}
