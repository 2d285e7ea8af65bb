//! Controller configuration.
//!
//! ```toml
//! keepalive_interval_ms = 300
//! settle_delay_ms = 500
//! min_firmware = "4.17"
//! event_capacity = 64
//! ```

use crate::constants::*;
use crate::error::{Result, SBrickError};
use crate::types::FirmwareVersion;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and compatibility settings for [`crate::MotorController`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Interval between keepalive probes; must stay below the device watchdog window
    pub keepalive_interval_ms: u64,
    /// Wait after a measurement-mode change before dependent commands are queued
    pub settle_delay_ms: u64,
    /// Oldest firmware revision accepted at connect time
    pub min_firmware: FirmwareVersion,
    /// Buffered events per subscriber before the oldest are dropped
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            keepalive_interval_ms: KEEPALIVE_INTERVAL_MS,
            settle_delay_ms: SETTLE_DELAY_MS,
            min_firmware: FirmwareVersion::new(4, 17),
            event_capacity: EVENT_CAPACITY,
        }
    }
}

impl ControllerConfig {
    /// Parse and validate a TOML document; missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: ControllerConfig =
            toml::from_str(s).map_err(|e| SBrickError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.keepalive_interval_ms == 0 || self.keepalive_interval_ms >= WATCHDOG_TIMEOUT_MS {
            return Err(SBrickError::Config(format!(
                "keepalive_interval_ms must be between 1 and {} (got {})",
                WATCHDOG_TIMEOUT_MS - 1,
                self.keepalive_interval_ms
            )));
        }
        if self.event_capacity == 0 {
            return Err(SBrickError::Config("event_capacity must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
