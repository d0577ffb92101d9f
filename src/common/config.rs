//! Configuration file handling

use serde::Deserialize;
use std::time::Duration;

use super::paths::{self, config_path};
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Channel settings
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,
}

/// Channel settings
#[derive(Debug, Deserialize)]
pub struct ChannelConfig {
    /// Channel name or socket path
    #[serde(default = "default_channel_name")]
    pub name: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: default_channel_name(),
        }
    }
}

fn default_channel_name() -> String {
    paths::CHANNEL_NAME.to_string()
}

/// Timeout settings
#[derive(Debug, Deserialize)]
pub struct Timeouts {
    /// How long connect waits for the host, in milliseconds
    #[serde(default = "default_connect_ms")]
    pub connect_ms: u64,

    /// Bound on one request/response round trip in seconds (0 disables)
    #[serde(default = "default_request_secs")]
    pub request_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect_ms: default_connect_ms(),
            request_secs: default_request_secs(),
        }
    }
}

fn default_connect_ms() -> u64 {
    5000
}
fn default_request_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    super::Error::FileRead {
                        path: path.display().to_string(),
                        error: e.to_string(),
                    }
                })?;
                return Self::from_toml_str(&content);
            }
        }
        Ok(Self::default())
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;

        if config.channel.name.trim().is_empty() {
            return Err(super::Error::Config("channel.name must not be empty".into()));
        }

        Ok(config)
    }

    /// Resolved channel string for the transport
    pub fn channel(&self) -> String {
        paths::resolve_channel(&self.channel.name)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.connect_ms)
    }

    /// `None` when request timeouts are disabled
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.timeouts.request_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
