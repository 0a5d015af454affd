//! Keeper configuration management.
//!
//! This module handles loading and saving the keeper configuration,
//! which covers the auth backend endpoint and all re-validation timings.
//!
//! Configuration is stored at `~/.config/sessionkeeper/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config directory paths
const APP_NAME: &str = "sessionkeeper";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Refresh this long before token expiry.
/// 5 minutes tolerates clock skew and network latency without causing
/// premature refresh churn.
const DEFAULT_REFRESH_LEAD_SECS: u64 = 300;

/// Interval between unconditional periodic re-validations.
const DEFAULT_PERIODIC_INTERVAL_SECS: u64 = 180;

/// How long the user must be inactive before an activity-derived
/// re-validation fires.
const DEFAULT_ACTIVITY_THRESHOLD_SECS: u64 = 300;

/// How often the activity staleness condition is polled.
const DEFAULT_ACTIVITY_POLL_SECS: u64 = 60;

/// Re-validation attempts allowed without an intervening success before
/// the circuit breaker opens.
const DEFAULT_MAX_CHECKS: u32 = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeeperConfig {
    /// Base URL of the auth backend.
    pub gateway_url: String,
    pub refresh_lead_secs: u64,
    pub periodic_interval_secs: u64,
    pub activity_threshold_secs: u64,
    pub activity_poll_secs: u64,
    pub max_checks: u32,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://127.0.0.1:54321".to_string(),
            refresh_lead_secs: DEFAULT_REFRESH_LEAD_SECS,
            periodic_interval_secs: DEFAULT_PERIODIC_INTERVAL_SECS,
            activity_threshold_secs: DEFAULT_ACTIVITY_THRESHOLD_SECS,
            activity_poll_secs: DEFAULT_ACTIVITY_POLL_SECS,
            max_checks: DEFAULT_MAX_CHECKS,
        }
    }
}

impl KeeperConfig {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let config: Self = serde_json::from_str(&contents)?;
            Ok(config.validated())
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// A zero interval would turn the keeper loop into a busy spin, and a
    /// zero check budget would permanently open the circuit breaker.
    pub fn validated(mut self) -> Self {
        if self.periodic_interval_secs == 0 {
            warn!("periodic_interval_secs is zero - clamping to 1");
            self.periodic_interval_secs = 1;
        }
        if self.activity_poll_secs == 0 {
            warn!("activity_poll_secs is zero - clamping to 1");
            self.activity_poll_secs = 1;
        }
        if self.max_checks == 0 {
            warn!("max_checks is zero - clamping to 1");
            self.max_checks = 1;
        }
        self
    }

    pub fn refresh_lead(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_lead_secs as i64)
    }

    pub fn periodic_interval(&self) -> Duration {
        Duration::from_secs(self.periodic_interval_secs)
    }

    pub fn activity_threshold(&self) -> Duration {
        Duration::from_secs(self.activity_threshold_secs)
    }

    pub fn activity_poll(&self) -> Duration {
        Duration::from_secs(self.activity_poll_secs)
    }
}
