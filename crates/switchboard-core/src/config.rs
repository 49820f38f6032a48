//! Configuration system for Switchboard
//!
//! Supports TOML configuration files with sensible defaults.
//! Configuration is loaded from:
//! - macOS: ~/Library/Application Support/switchboard/config.toml
//! - Linux: ~/.config/switchboard/config.toml
//! - Windows: %APPDATA%/switchboard/config.toml

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ConfigError;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listener settings
    pub server: ServerConfig,
    /// Registry and routing settings
    pub relay: RelayConfig,
    /// Landing page and static asset settings
    pub http: HttpConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port for both WebSocket and HTTP traffic
    pub port: u16,
    /// Bind address
    pub bind: IpAddr,
    /// How long a new connection may take to send its request head
    pub handshake_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: crate::DEFAULT_PORT,
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            handshake_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}

/// Registry and routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Events buffered per peer before new ones are dropped
    pub outbox_capacity: usize,
    /// Connection events buffered in front of the registry
    pub hub_queue_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            outbox_capacity: 64,
            hub_queue_capacity: 1024,
        }
    }
}

/// HTTP collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Directory served for plain GET requests
    pub public_dir: PathBuf,
    /// Serve files from `public_dir` (the landing page and /health are always on)
    pub serve_static: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            public_dir: PathBuf::from("public"),
            serve_static: true,
        }
    }
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path).unwrap_or_else(|e| {
                warn!("Failed to load config from {:?}: {}, using defaults", path, e);
                Self::default()
            }),
            None => {
                debug!("No config directory found, using defaults");
                Self::default()
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))?;

        info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "switchboard", "switchboard")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}
