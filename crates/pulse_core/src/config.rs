//! Configuration for the freshness cache.

use crate::error::{PulseError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level pulse configuration.
///
/// Loaded from `config.toml` in the pulse directory when present; every
/// field has a default, so a missing or partial file is fine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Background synchronization configuration.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Maintenance sweep configuration.
    #[serde(default)]
    pub sweep: SweepConfig,
}

impl Config {
    /// Load configuration from `config.toml` under the pulse directory.
    pub fn load(pulse_dir: &Path) -> Result<Self> {
        let path = pulse_dir.join("config.toml");
        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| PulseError::ConfigError(format!("failed to read config: {}", e)))?;
            toml::from_str(&content)
                .map_err(|e| PulseError::ConfigError(format!("failed to parse config: {}", e)))
        } else {
            Ok(Config::default())
        }
    }
}

/// Background synchronization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Master opt-out toggle: when false, no background fetches happen and
    /// the prompt never shows the "synced" indicator (default: true).
    pub enabled: bool,

    /// How long a successful sync is considered fresh, in seconds
    /// (default: 900).
    pub freshness_window_secs: u64,

    /// Maximum wall-clock time a fetch may run before it is killed,
    /// in seconds (default: 20).
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            freshness_window_secs: 900,
            timeout_secs: 20,
        }
    }
}

impl SyncConfig {
    /// Returns the fetch timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Seconds after which a lock marker counts as abandoned.
    ///
    /// A crashed sync leaves its marker behind; anything older than a
    /// generous multiple of the fetch timeout cannot belong to a live
    /// attempt and is safe to reclaim.
    pub fn lock_grace_secs(&self) -> i64 {
        (self.timeout_secs as i64) * 10
    }
}

/// Maintenance sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Records idle for more than this many days are removed (default: 30).
    pub retention_days: u32,

    /// Minimum seconds between opportunistic sweeps (default: 86400).
    pub interval_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            retention_days: 30,
            interval_secs: 24 * 60 * 60,
        }
    }
}

impl SweepConfig {
    /// Retention window in seconds.
    pub fn retention_secs(&self) -> i64 {
        self.retention_days as i64 * 24 * 60 * 60
    }
}
