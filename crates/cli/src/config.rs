//! Configuration management for the CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PROXY_URL: &str = "http://localhost:9000";

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Proxy base URL
    pub proxy_url: Option<String>,
    /// Table page size (5, 10 or 25)
    pub rows_per_page: Option<usize>,
    /// Poll interval for `watch`, in seconds
    pub poll_interval_secs: Option<u64>,
    /// Chart timestamp offset in minutes east of UTC
    pub display_offset_minutes: Option<i32>,
}

impl Config {
    /// Load configuration from the default file, if present
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file; a missing file is empty config
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Get the configuration file path
    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("zbx").join("config.json"))
    }

    /// Proxy URL: flag or env first, then file, then the default
    pub fn proxy_url(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.proxy_url.clone())
            .unwrap_or_else(|| DEFAULT_PROXY_URL.to_string())
    }
}
