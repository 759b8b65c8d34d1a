//! Server configuration.
//!
//! Values come from defaults, then an optional TOML file, then whatever the
//! binary layers on top from the environment and command line.
//!
//! ```toml
//! host = "127.0.0.1"
//! port = 9000
//! history_path = "/var/lib/netchat/savedChat.txt"
//! max_clients = 10
//! write_timeout_secs = 10
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Default TCP port.
pub const DEFAULT_PORT: u16 = 8989;

/// Default bind address.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default maximum number of registered clients.
pub const DEFAULT_MAX_CLIENTS: usize = crate::registry::MAX_CLIENTS;

/// Default transcript location.
pub const DEFAULT_HISTORY_PATH: &str = "./savedChat.txt";

/// Default banner asset location.
pub const DEFAULT_BANNER_PATH: &str = "./pingoin.txt";

/// Default deadline for a single write to a client.
pub const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 10;

/// Runtime configuration for the chat server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,

    /// Port to bind (0 picks an ephemeral port).
    pub port: u16,

    /// Transcript file, truncated at startup.
    pub history_path: PathBuf,

    /// Welcome banner asset.
    pub banner_path: PathBuf,

    /// Ceiling on simultaneously registered clients.
    pub max_clients: usize,

    /// Deadline for each write to a client.
    pub write_timeout_secs: u64,

    /// Disconnect a session after this long without input. `None` waits forever.
    pub idle_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            history_path: PathBuf::from(DEFAULT_HISTORY_PATH),
            banner_path: PathBuf::from(DEFAULT_BANNER_PATH),
            max_clients: DEFAULT_MAX_CLIENTS,
            write_timeout_secs: DEFAULT_WRITE_TIMEOUT_SECS,
            idle_timeout_secs: None,
        }
    }
}

impl ServerConfig {
    /// Loads a configuration file, filling unspecified fields with defaults.
    ///
    /// # Errors
    ///
    /// - `ConfigError::Read` if the file cannot be read
    /// - `ConfigError::Parse` if it is not valid TOML for this schema
    /// - `ConfigError::Invalid` if a value is out of range
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` or `ConfigError::Invalid`.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_clients == 0 {
            return Err(ConfigError::Invalid {
                field: "max_clients",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.write_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "write_timeout_secs",
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.idle_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid {
                field: "idle_timeout_secs",
                reason: "must be at least 1 second when set".to_string(),
            });
        }
        Ok(())
    }

    /// Returns `host:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the per-write deadline.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    /// Returns the idle read deadline, if any.
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {error}")]
    Read { path: PathBuf, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
