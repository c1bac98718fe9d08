//! Configuration loading and management.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server identity.
    pub server: ServerConfig,
    /// Relay (WebSocket) listener.
    pub listen: ListenConfig,
    /// HTTP API listener.
    pub http: HttpConfig,
    /// Database configuration.
    pub database: Option<DatabaseConfig>,
    /// Group limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Statically seeded sessions (development only).
    #[serde(default)]
    pub sessions: Vec<SessionBlock>,
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name (e.g., "relay.parley.im").
    pub name: String,
}

/// Relay listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to bind the WebSocket listener to (e.g., "0.0.0.0:8800").
    pub address: SocketAddr,
}

/// HTTP API listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Address to bind the HTTP listener to (e.g., "0.0.0.0:8801").
    pub address: SocketAddr,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file.
    pub path: String,
}

/// Group limits configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum durable members per group, checked at join time.
    #[serde(default = "default_max_group_members")]
    pub max_group_members: i64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_group_members: default_max_group_members(),
        }
    }
}

fn default_max_group_members() -> i64 {
    10
}

/// A statically seeded session. The referenced user is created at boot if
/// it does not exist yet.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionBlock {
    /// Bearer token.
    pub token: String,
    /// Username the token authenticates as.
    pub username: String,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
