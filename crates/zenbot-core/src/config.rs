//! Configuration management for zenbot
//!
//! The file is JSON; every field has a default so a missing file (or a
//! partial one) still yields a usable configuration.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

/// Global zenbot configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Minimum time between two violation notices for the same zen (seconds)
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,

    /// Pause between two expiration sweeps (seconds)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Cooldown a freshly started zen begins with (seconds).
    /// Zero makes enforcement active immediately.
    #[serde(default = "default_initial_grace")]
    pub initial_grace_secs: u64,

    /// Channel names commands are accepted in. Empty allows every channel.
    #[serde(default)]
    pub channel_allowlist: BTreeSet<String>,

    /// User id -> display name
    #[serde(default)]
    pub users: BTreeMap<String, String>,

    /// Channel id -> channel name
    #[serde(default)]
    pub channels: BTreeMap<String, String>,

    /// Verbose logging
    #[serde(default)]
    pub debug: bool,
}

fn default_cooldown() -> u64 {
    10
}

fn default_sweep_interval() -> u64 {
    1
}

fn default_initial_grace() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown(),
            sweep_interval_secs: default_sweep_interval(),
            initial_grace_secs: default_initial_grace(),
            channel_allowlist: BTreeSet::new(),
            users: BTreeMap::new(),
            channels: BTreeMap::new(),
            debug: false,
        }
    }
}

impl Config {
    /// Load config from file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the bot cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval_secs == 0 {
            bail!("sweep_interval_secs must be at least 1");
        }
        Ok(())
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn initial_grace(&self) -> Duration {
        Duration::from_secs(self.initial_grace_secs)
    }
}
