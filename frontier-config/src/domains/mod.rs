//! Domain-specific configuration modules

pub mod logging;
pub mod main_thread;
pub mod message_bus;
pub mod reset;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main frontier worker configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FrontierConfig {
    /// Main-thread operator configuration
    #[serde(default)]
    pub main_thread: main_thread::MainThreadConfig,

    /// Reset protocol configuration
    #[serde(default)]
    pub reset: reset::ResetConfig,

    /// Message bus configuration
    #[serde(default)]
    pub message_bus: message_bus::MessageBusConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl FrontierConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.main_thread.validate()?;
        self.reset.validate()?;
        self.message_bus.validate()?;
        self.logging.validate()?;

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = FrontierConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
