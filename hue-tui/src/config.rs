//! Persisted bridge credentials
//!
//! Stored as pretty JSON at `$XDG_CONFIG_HOME/hue-tui/config.json`, or under
//! the platform config directory when `XDG_CONFIG_HOME` is unset.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const CONFIG_DIR_NAME: &str = "hue-tui";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine the config directory")]
    NoConfigDir,

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Bridge not found: {0}")]
    BridgeNotFound(String),

    #[error("No bridges configured")]
    NoBridges,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Credentials for one paired bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub host: String,
    /// Application key issued during pairing
    pub username: String,
    pub bridge_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bridges: Vec<BridgeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_bridge_id: Option<String>,
}

/// Directory holding the config file
pub fn config_dir() -> Result<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(xdg).join(CONFIG_DIR_NAME));
    }
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME))
        .ok_or(ConfigError::NoConfigDir)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

impl Config {
    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Load from `path`; a missing file is an empty config
    pub fn load_from(path: &Path) -> Result<Self> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_slice(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    /// Write to `path`, creating parent directories
    ///
    /// The file holds an application key, so it is private to the user.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }

        let data = serde_json::to_vec_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path).map_err(io_err)?;
        file.write_all(&data).map_err(io_err)?;
        tracing::debug!("saved config to {}", path.display());
        Ok(())
    }

    /// Add a bridge, replacing any entry with the same id
    pub fn add_bridge(&mut self, bridge: BridgeConfig) {
        match self
            .bridges
            .iter_mut()
            .find(|b| b.bridge_id == bridge.bridge_id)
        {
            Some(existing) => *existing = bridge,
            None => self.bridges.push(bridge),
        }
    }

    pub fn bridge(&self, bridge_id: &str) -> Result<&BridgeConfig> {
        self.bridges
            .iter()
            .find(|b| b.bridge_id == bridge_id)
            .ok_or_else(|| ConfigError::BridgeNotFound(bridge_id.to_string()))
    }

    /// The last used bridge, or the first one when that is unknown
    pub fn last_bridge(&self) -> Result<&BridgeConfig> {
        let first = self.bridges.first().ok_or(ConfigError::NoBridges)?;
        Ok(self
            .last_bridge_id
            .as_deref()
            .and_then(|id| self.bridge(id).ok())
            .unwrap_or(first))
    }

    pub fn remove_bridge(&mut self, bridge_id: &str) {
        self.bridges.retain(|b| b.bridge_id != bridge_id);
    }

    pub fn has_bridges(&self) -> bool {
        !self.bridges.is_empty()
    }
}
