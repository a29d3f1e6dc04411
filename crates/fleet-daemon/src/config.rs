// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration (spec §2 ambient "Configuration"): resolve a state
//! directory the way the teacher's `daemon::env` module does, then load the
//! rest of the knobs from an optional TOML file with serde defaults filling
//! in anything the file omits.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use fleet_core::{ErrorKind, FleetError};

/// Resolve the state directory: `FLEET_STATE_DIR` > `~/.fleet`.
pub fn state_dir() -> Result<PathBuf, FleetError> {
    if let Ok(dir) = std::env::var("FLEET_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().ok_or_else(|| FleetError::new(ErrorKind::Internal, "no home directory"))?;
    Ok(home.join(".fleet"))
}

/// Resolve the config file path: `FLEET_CONFIG` > `<state_dir>/config.toml`.
pub fn config_path(state_dir: &Path) -> PathBuf {
    std::env::var("FLEET_CONFIG").map(PathBuf::from).unwrap_or_else(|_| state_dir.join("config.toml"))
}

fn default_max_concurrent() -> usize {
    4
}

fn default_max_retries() -> u32 {
    0
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

fn default_log_buffer_size() -> usize {
    1000
}

fn default_ws_addr() -> String {
    "127.0.0.1:4411".to_string()
}

fn default_embedding_endpoint() -> Option<String> {
    None
}

fn default_vector_dim_probe_text() -> String {
    "fleet vector dimension probe".to_string()
}

/// Daemon-wide configuration. Every field has a default so a missing or
/// partial config file is never an error; only a malformed one is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub state_dir: PathBuf,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    #[serde(default = "default_log_buffer_size")]
    pub log_buffer_size: usize,

    #[serde(default = "default_ws_addr")]
    pub ws_addr: String,

    #[serde(default = "default_embedding_endpoint")]
    pub embedding_endpoint: Option<String>,

    #[serde(default = "default_vector_dim_probe_text")]
    pub vector_dim_probe_text: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::new(),
            max_concurrent: default_max_concurrent(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            log_buffer_size: default_log_buffer_size(),
            ws_addr: default_ws_addr(),
            embedding_endpoint: default_embedding_endpoint(),
            vector_dim_probe_text: default_vector_dim_probe_text(),
        }
    }
}

impl Config {
    /// Load from `FLEET_STATE_DIR`/`FLEET_CONFIG` (or their fallbacks),
    /// filling in defaults for anything the TOML file doesn't set. A missing
    /// config file is not an error; a present-but-unparseable one is.
    pub fn load() -> Result<Self, FleetError> {
        let state_dir = state_dir()?;
        let path = config_path(&state_dir);
        let mut config = match fs_read_to_string(&path)? {
            Some(raw) => toml::from_str::<Config>(&raw)
                .map_err(|e| FleetError::new(ErrorKind::Internal, format!("invalid config at {}: {e}", path.display())))?,
            None => Config::default(),
        };
        config.state_dir = state_dir;
        Ok(config)
    }

    pub fn scheduler_config(&self) -> fleet_engine::SchedulerConfig {
        fleet_engine::SchedulerConfig {
            max_concurrent: self.max_concurrent,
            max_retries: self.max_retries,
            backoff_base_ms: self.backoff_base_ms,
            backoff_max_ms: self.backoff_max_ms,
        }
    }
}

fn fs_read_to_string(path: &Path) -> Result<Option<String>, FleetError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(FleetError::new(ErrorKind::Internal, format!("reading {}: {e}", path.display()))),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
