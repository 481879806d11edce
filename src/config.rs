//! Canvas configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::consts::{DEFAULT_DEMO_PEERS, DEFAULT_FLUSH_INTERVAL_MS, DEFAULT_ROOM, DEFAULT_SNAPSHOT_PATH};
use crate::error::ErrorCode;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Invalid { .. } => "E_CONFIG_INVALID",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasConfig {
    pub room: String,
    pub snapshot_path: PathBuf,
    /// Login name; a generated guest name when absent.
    pub user_name: Option<String>,
    pub flush_interval: Duration,
    pub demo_peers: usize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            room: DEFAULT_ROOM.to_string(),
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            user_name: None,
            flush_interval: Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS),
            demo_peers: DEFAULT_DEMO_PEERS,
        }
    }
}

impl CanvasConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `CANVAS_ROOM`: default `syn-global-room`
    /// - `CANVAS_SNAPSHOT_PATH`: default `syn-index-db.automerge`
    /// - `CANVAS_USER_NAME`: generated guest name when absent
    /// - `CANVAS_FLUSH_INTERVAL_MS`: default 1000
    /// - `CANVAS_DEMO_PEERS`: default 2
    ///
    /// # Errors
    ///
    /// `ConfigError::Invalid` when a numeric variable does not parse or is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var_os(key).map(|v| v.to_string_lossy().into_owned()))
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`CanvasConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let room = non_empty("CANVAS_ROOM").unwrap_or_else(|| DEFAULT_ROOM.to_string());
        let snapshot_path =
            PathBuf::from(non_empty("CANVAS_SNAPSHOT_PATH").unwrap_or_else(|| DEFAULT_SNAPSHOT_PATH.to_string()));
        let user_name = non_empty("CANVAS_USER_NAME");
        let flush_ms = env_parse("CANVAS_FLUSH_INTERVAL_MS", non_empty("CANVAS_FLUSH_INTERVAL_MS"), DEFAULT_FLUSH_INTERVAL_MS)?;
        let demo_peers = env_parse("CANVAS_DEMO_PEERS", non_empty("CANVAS_DEMO_PEERS"), DEFAULT_DEMO_PEERS)?;

        Ok(Self { room, snapshot_path, user_name, flush_interval: Duration::from_millis(flush_ms), demo_peers })
    }
}

/// Parse a positive number, defaulting when unset.
fn env_parse<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialEq + Default,
{
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.parse::<T>() {
        Ok(value) if value != T::default() => Ok(value),
        _ => Err(ConfigError::Invalid { var, value: raw }),
    }
}
