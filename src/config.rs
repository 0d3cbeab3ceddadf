//! Host configuration.
//!
//! Defaults, overlaid by `<config dir>/host.json` when present, then by the
//! `TABHOST_DATA_DIR` environment variable. The binary applies CLI flags last.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::platform;
use crate::types::errors::ConfigError;

pub const DATA_DIR_ENV: &str = "TABHOST_DATA_DIR";
pub const CONFIG_FILE: &str = "host.json";

/// Autosave period: five minutes.
pub const DEFAULT_AUTOSAVE_SECS: u64 = 5 * 60;
pub const DEFAULT_PERMISSION_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HostConfig {
    pub profile_dir: PathBuf,
    /// Where consumed snapshots are moved.
    pub relocation_dir: PathBuf,
    pub autosave_interval_secs: u64,
    /// 0 disables the timeout; a request then waits for an answer forever.
    pub permission_timeout_secs: u64,
    pub log_level: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            profile_dir: platform::get_data_dir(),
            relocation_dir: platform::get_temp_dir(),
            autosave_interval_secs: DEFAULT_AUTOSAVE_SECS,
            permission_timeout_secs: DEFAULT_PERMISSION_TIMEOUT_SECS,
            log_level: "info".to_string(),
        }
    }
}

impl HostConfig {
    /// Config rooted at `profile_dir`, everything else default. Used by tests
    /// and embedders that manage their own paths.
    pub fn for_profile(profile_dir: impl Into<PathBuf>) -> Self {
        let profile_dir = profile_dir.into();
        Self {
            relocation_dir: profile_dir.join("relocated"),
            profile_dir,
            ..Default::default()
        }
    }

    /// Loads from the platform config directory and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file(&platform::get_config_dir().join(CONFIG_FILE))?;
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.is_empty() {
                config.profile_dir = PathBuf::from(dir);
            }
        }
        Ok(config)
    }

    /// Reads a config file; a missing file yields defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::Io(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        serde_json::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse {}: {}", path.display(), e)))
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs.max(1))
    }

    pub fn permission_timeout(&self) -> Option<Duration> {
        match self.permission_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
