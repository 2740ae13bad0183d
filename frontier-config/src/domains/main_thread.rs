//! Main-thread operator configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive_duration, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main-thread operator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MainThreadConfig {
    /// Delay between two drains of the job queue, in milliseconds
    #[serde(
        with = "crate::domains::utils::serde_duration_millis",
        default = "default_tick_interval"
    )]
    pub tick_interval: Duration,

    /// Delay before the first drain after startup, in milliseconds
    #[serde(
        with = "crate::domains::utils::serde_duration_millis",
        default = "default_tick_interval"
    )]
    pub initial_delay: Duration,
}

impl Default for MainThreadConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            initial_delay: default_tick_interval(),
        }
    }
}

impl Validatable for MainThreadConfig {
    fn validate(&self) -> ConfigResult<()> {
        // A zero interval would turn the drain loop into a busy spin
        validate_positive_duration(self.tick_interval, "tick_interval", self.domain_name())?;

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "main_thread"
    }
}

fn default_tick_interval() -> Duration {
    Duration::from_millis(100)
}
