//! Application configuration
//!
//! Stored in ~/.config/smbtv/config.json. A missing file means defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Default pause before connect/list
const DEFAULT_SETTLE_DELAY_MS: u64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pause before each connect/list request, in milliseconds
    pub settle_delay_ms: u64,
    /// External player used for previews
    pub player: PlayerConfig,
    /// Directory holding gvfs mounts (defaults to $XDG_RUNTIME_DIR/gvfs)
    pub gvfs_root: Option<PathBuf>,
    /// Explicit mount points keyed by "server/share"
    pub mounts: HashMap<String, PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            player: PlayerConfig::default(),
            gvfs_root: None,
            mounts: HashMap::new(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: "mpv".to_string(),
            args: vec![
                "--no-terminal".to_string(),
                "--force-window=immediate".to_string(),
            ],
        }
    }
}

impl Config {
    /// Load the config from disk, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            debug!("No config found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        Self::from_json(&contents).with_context(|| format!("Failed to parse config {:?}", path))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(contents)?;
        debug!("Loaded config with {} explicit mounts", config.mounts.len());
        Ok(config)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// gvfs mount directory, if one can be determined
    pub fn gvfs_root(&self) -> Option<PathBuf> {
        self.gvfs_root
            .clone()
            .or_else(|| dirs::runtime_dir().map(|dir| dir.join("gvfs")))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("smbtv").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.settle_delay(), Duration::from_millis(300));
        assert_eq!(config.player.command, "mpv");
        assert!(config.mounts.is_empty());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = Config::from_json(
            r#"{ "settle_delay_ms": 0, "mounts": { "nas/media": "/mnt/media" } }"#,
        )
        .unwrap();
        assert_eq!(config.settle_delay(), Duration::ZERO);
        assert_eq!(config.player.command, "mpv");
        assert_eq!(config.mounts["nas/media"], PathBuf::from("/mnt/media"));
    }

    #[test]
    fn test_explicit_gvfs_root_wins() {
        let config = Config {
            gvfs_root: Some(PathBuf::from("/tmp/gvfs")),
            ..Config::default()
        };
        assert_eq!(config.gvfs_root(), Some(PathBuf::from("/tmp/gvfs")));
    }
}
