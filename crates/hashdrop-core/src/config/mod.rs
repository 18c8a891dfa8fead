//! Configuration management for Hashdrop.
//!
//! This module handles loading, saving, and validating Hashdrop configuration.
//!
//! ## Configuration File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/hashdrop/config.toml` |
//! | macOS | `~/Library/Application Support/com.hashdrop.Hashdrop/config.toml` |
//! | Windows | `%APPDATA%\Hashdrop\Hashdrop\config\config.toml` |
//!
//! A missing file yields the defaults. Command-line flags override whatever
//! is loaded here.
//!
//! ## Example
//!
//! ```rust,ignore
//! use hashdrop_core::config::Config;
//!
//! let config = Config::load()?;
//! println!("Serving on port {}", config.server.port);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration struct for Hashdrop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Tunnel discovery settings
    pub tunnel: TunnelConfig,
}

/// HTTP server configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening port
    pub port: u16,
    /// Bind address
    pub bind: String,
    /// Directory holding uploaded files
    pub upload_dir: PathBuf,
    /// Largest accepted request body
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: crate::DEFAULT_PORT,
            bind: "0.0.0.0".to_string(),
            upload_dir: PathBuf::from(crate::DEFAULT_UPLOAD_DIR),
            max_upload_bytes: crate::DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Tunnel discovery configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelConfig {
    /// Base URL of the local tunnel agent's API
    pub api_url: String,
    /// Time between background probes
    #[serde(with = "humantime_serde")]
    pub probe_interval: Duration,
    /// Upper bound on a single agent request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Port for which any single HTTP tunnel is accepted as ours
    pub default_port: u16,
    /// Host suffixes that identify a request arriving through a tunnel
    pub domains: Vec<String>,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            api_url: crate::DEFAULT_AGENT_URL.to_string(),
            probe_interval: Duration::from_secs(crate::DEFAULT_PROBE_INTERVAL_SECS),
            request_timeout: Duration::from_secs(crate::DEFAULT_PROBE_TIMEOUT_SECS),
            default_port: crate::DEFAULT_PORT,
            domains: crate::DEFAULT_TUNNEL_DOMAINS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// If the configuration file doesn't exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("Failed to read config: {e}")))?;

        toml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to the default location.
    ///
    /// Creates the configuration directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!("Failed to create config directory: {e}"))
            })?;
        }

        std::fs::write(path, self.to_toml()?)
            .map_err(|e| Error::ConfigError(format!("Failed to write config: {e}")))
    }

    /// Render as pretty TOML, the format written by [`Config::save`].
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))
    }

    /// Check values that would make the server unusable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("server.port", "must be non-zero"));
        }
        if self.server.upload_dir.as_os_str().is_empty() {
            return Err(invalid("server.upload_dir", "must not be empty"));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(invalid("server.max_upload_bytes", "must be non-zero"));
        }
        if self.tunnel.probe_interval.is_zero() {
            return Err(invalid("tunnel.probe_interval", "must be non-zero"));
        }
        if self.tunnel.request_timeout.is_zero() {
            return Err(invalid("tunnel.request_timeout", "must be non-zero"));
        }
        if !self.tunnel.api_url.starts_with("http://") && !self.tunnel.api_url.starts_with("https://")
        {
            return Err(invalid("tunnel.api_url", "must be an http(s) URL"));
        }
        Ok(())
    }

    /// Get the default configuration directory path.
    #[must_use]
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "hashdrop", "Hashdrop")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the full path to the configuration file.
    #[must_use]
    pub fn config_path() -> PathBuf {
        Self::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }
}

fn invalid(key: &str, reason: &str) -> Error {
    Error::InvalidConfig {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.strip_suffix("ms")
            .map(|ms| {
                ms.parse()
                    .map(Duration::from_millis)
                    .map_err(serde::de::Error::custom)
            })
            .or_else(|| {
                s.strip_suffix('s').map(|secs| {
                    secs.parse()
                        .map(Duration::from_secs)
                        .map_err(serde::de::Error::custom)
                })
            })
            .or_else(|| {
                s.strip_suffix('m').map(|mins| {
                    mins.parse::<u64>()
                        .map(|m| Duration::from_secs(m * 60))
                        .map_err(serde::de::Error::custom)
                })
            })
            .unwrap_or_else(|| Err(serde::de::Error::custom("invalid duration format")))
    }
}
