//! Configuration loading and persistence.
//!
//! Settings live in `config.json` under the platform config directory
//! (or `LIGHTING_CONFIG_DIR`). Environment variables override the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{fs, time::Duration};

use crate::constants::{DEFAULT_ENDPOINT, DEFAULT_HANDSHAKE, RECONNECT_DELAY};

/// Configuration for the lighting client.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Controller WebSocket URL. `http(s)://` is accepted and rewritten.
    pub endpoint: String,
    /// Milliseconds to wait after a close before reconnecting.
    pub reconnect_delay_ms: u64,
    /// Text frame sent right after connecting. Empty disables it.
    pub handshake: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            reconnect_delay_ms: u64::try_from(RECONNECT_DELAY.as_millis()).unwrap_or(1000),
            handshake: DEFAULT_HANDSHAKE.to_string(),
        }
    }
}

impl Config {
    /// Returns the configuration directory path.
    ///
    /// `LIGHTING_CONFIG_DIR` wins; otherwise the platform config dir
    /// (e.g. `~/.config/lighting-client`).
    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("LIGHTING_CONFIG_DIR") {
            return Ok(PathBuf::from(dir));
        }
        Ok(dirs::config_dir()
            .context("Could not determine config directory")?
            .join("lighting-client"))
    }

    /// Loads configuration from the config directory, with environment
    /// variable overrides. A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let path = Self::config_dir()?.join("config.json");
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            log::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from an explicit file, without env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var("LIGHTING_ENDPOINT") {
            self.endpoint = endpoint;
        }

        if let Ok(delay) = std::env::var("LIGHTING_RECONNECT_DELAY_MS") {
            if let Ok(ms) = delay.parse::<u64>() {
                self.reconnect_delay_ms = ms;
            }
        }

        if let Ok(handshake) = std::env::var("LIGHTING_HANDSHAKE") {
            self.handshake = handshake;
        }
    }

    /// Persists the configuration to `config.json` in the config directory.
    pub fn save(&self) -> Result<PathBuf> {
        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)?;
        let path = dir.join("config.json");
        self.save_to(&path)?;
        Ok(path)
    }

    /// Persists the configuration to an explicit file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write config file {}", path.display()))
    }

    /// Delay between a close and the next connection attempt.
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Endpoint with its scheme normalized to `ws://` / `wss://`.
    #[must_use]
    pub fn ws_url(&self) -> String {
        crate::ws::http_to_ws_scheme(&self.endpoint)
    }
}
