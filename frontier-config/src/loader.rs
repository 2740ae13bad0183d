//! Configuration loading and environment variable handling

use crate::domains::FrontierConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "FRONTIER".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML or JSON file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<FrontierConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let mut config: FrontierConfig = if is_json {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<FrontierConfig> {
        let mut config = FrontierConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<FrontierConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut FrontierConfig) -> ConfigResult<()> {
        self.apply_main_thread_overrides(&mut config.main_thread)?;
        self.apply_reset_overrides(&mut config.reset)?;
        self.apply_message_bus_overrides(&mut config.message_bus)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    /// Apply main-thread config overrides
    fn apply_main_thread_overrides(
        &self,
        config: &mut crate::domains::main_thread::MainThreadConfig,
    ) -> ConfigResult<()> {
        if let Some(millis) = self.parse_env_var::<u64>("TICK_INTERVAL_MS")? {
            config.tick_interval = Duration::from_millis(millis);
        }

        Ok(())
    }

    /// Apply reset config overrides
    fn apply_reset_overrides(
        &self,
        config: &mut crate::domains::reset::ResetConfig,
    ) -> ConfigResult<()> {
        if let Some(millis) = self.parse_env_var::<u64>("RESET_POLL_TIMEOUT_MS")? {
            config.poll_timeout = Duration::from_millis(millis);
        }

        if let Some(millis) = self.parse_env_var::<u64>("RESET_GRACE_PERIOD_MS")? {
            config.grace_period = Duration::from_millis(millis);
        }

        if let Some(seconds) = self.parse_env_var::<u64>("RESET_TIMEOUT_SECONDS")? {
            config.reset_timeout = Duration::from_secs(seconds);
        }

        Ok(())
    }

    /// Apply message bus config overrides
    fn apply_message_bus_overrides(
        &self,
        config: &mut crate::domains::message_bus::MessageBusConfig,
    ) -> ConfigResult<()> {
        if let Ok(topic) = self.get_env_var("RESET_TOPIC") {
            config.reset_topic = topic;
        }

        if let Ok(topic) = self.get_env_var("RESET_ACK_TOPIC") {
            config.reset_ack_topic = topic;
        }

        Ok(())
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Parse an optional prefixed environment variable
    fn parse_env_var<T>(&self, name: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_env_var(name) {
            Ok(raw) => raw
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e))),
            Err(_) => Ok(None),
        }
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
