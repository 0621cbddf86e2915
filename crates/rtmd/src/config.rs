//! Server daemon configuration
//!
//! Defaults, an optional TOML configuration file, and command-line
//! overrides, merged in that order.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, ServerError};

/// Default cap on concurrently connected clients.
pub const DEFAULT_MAX_CLIENTS: usize = 20;

/// Default listening socket location.
pub fn default_socket_path() -> PathBuf {
    std::env::temp_dir().join("rtmd.sock")
}

/// Runtime configuration for the RTM server daemon.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Filesystem path of the listening Unix socket.
    pub socket_path: PathBuf,
    /// Maximum number of concurrently connected clients.
    pub max_clients: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            max_clients: DEFAULT_MAX_CLIENTS,
        }
    }
}

impl ServerConfig {
    /// Merge defaults, a configuration file and command-line overrides.
    /// Overrides win over the file, the file wins over defaults.
    pub fn resolve(
        file: ConfigFile,
        socket_path: Option<PathBuf>,
        max_clients: Option<usize>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            socket_path: socket_path
                .or(file.socket_path)
                .unwrap_or(defaults.socket_path),
            max_clients: max_clients
                .or(file.max_clients)
                .unwrap_or(defaults.max_clients),
        }
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_clients == 0 {
            return Err(ServerError::config("max_clients must be at least 1"));
        }
        if self.socket_path.as_os_str().is_empty() {
            return Err(ServerError::config("socket_path must not be empty"));
        }
        Ok(())
    }
}

/// On-disk configuration file. Every field is optional; absent fields fall
/// back to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    /// Listening socket path.
    pub socket_path: Option<PathBuf>,
    /// Client connection cap.
    pub max_clients: Option<usize>,
}

impl ConfigFile {
    /// Load and parse a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            ServerError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        toml::from_str(&text)
            .map_err(|e| ServerError::config(format!("cannot parse {}: {}", path.display(), e)))
    }
}
