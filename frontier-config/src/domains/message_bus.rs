//! Message bus configuration

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, Validatable};
use serde::{Deserialize, Serialize};

/// Message bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageBusConfig {
    /// Topic carrying reset control signals
    #[serde(default = "default_reset_topic")]
    pub reset_topic: String,

    /// Topic carrying reset acknowledgments
    #[serde(default = "default_reset_ack_topic")]
    pub reset_ack_topic: String,

    /// Maximum records retained per topic by the in-process bus
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
}

impl Default for MessageBusConfig {
    fn default() -> Self {
        Self {
            reset_topic: default_reset_topic(),
            reset_ack_topic: default_reset_ack_topic(),
            capacity: None,
        }
    }
}

impl Validatable for MessageBusConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.reset_topic, "reset_topic", self.domain_name())?;
        validate_required_string(&self.reset_ack_topic, "reset_ack_topic", self.domain_name())?;

        if self.reset_topic == self.reset_ack_topic {
            return Err(self.validation_error(
                "reset_topic and reset_ack_topic must be different logs",
            ));
        }

        if self.capacity == Some(0) {
            return Err(self.validation_error("capacity must be greater than 0"));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "message_bus"
    }
}

fn default_reset_topic() -> String {
    "frontier-reset".to_string()
}

fn default_reset_ack_topic() -> String {
    "frontier-reset-ack".to_string()
}
