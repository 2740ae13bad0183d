//! Reset protocol configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive_duration, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reset consumer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetConfig {
    /// Delay between two polls of the reset log, in milliseconds
    #[serde(
        with = "crate::domains::utils::serde_duration_millis",
        default = "default_poll_interval"
    )]
    pub poll_interval: Duration,

    /// Maximum time a single poll waits for a message, in milliseconds
    #[serde(
        with = "crate::domains::utils::serde_duration_millis",
        default = "default_poll_timeout"
    )]
    pub poll_timeout: Duration,

    /// Time given to sibling components to quiesce after the stop signal,
    /// in milliseconds
    #[serde(
        with = "crate::domains::utils::serde_duration_millis",
        default = "default_grace_period"
    )]
    pub grace_period: Duration,

    /// Time after which a pending reset is considered done.
    ///
    /// Stored in whole seconds: a sub-second part set in code is dropped
    /// when the configuration is serialized.
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_reset_timeout"
    )]
    pub reset_timeout: Duration,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            poll_timeout: default_poll_timeout(),
            grace_period: default_grace_period(),
            reset_timeout: default_reset_timeout(),
        }
    }
}

impl Validatable for ResetConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive_duration(self.reset_timeout, "reset_timeout", self.domain_name())?;
        validate_positive_duration(self.poll_timeout, "poll_timeout", self.domain_name())?;

        if self.grace_period >= self.reset_timeout {
            return Err(self.validation_error(format!(
                "grace_period ({:?}) must be shorter than reset_timeout ({:?})",
                self.grace_period, self.reset_timeout
            )));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "reset"
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(10)
}

fn default_poll_timeout() -> Duration {
    Duration::from_secs(1)
}

fn default_grace_period() -> Duration {
    Duration::from_secs(5)
}

fn default_reset_timeout() -> Duration {
    Duration::from_secs(60)
}
