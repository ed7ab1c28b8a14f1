use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::reveal::DEFAULT_REVEAL_INTERVAL;
use crate::theme::Theme;

/// Environment variable that overrides `backend_url` from the config file.
pub const BACKEND_URL_ENV: &str = "SENPAI_BACKEND_URL";

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub backend_url: Option<String>,
    pub theme: Option<Theme>,
    pub reveal_interval_ms: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the config file, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::get_config_path()?)?;
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            config.backend_url = Some(url);
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Backend base URL with any trailing slash removed. An absent URL is
    /// returned as an empty string; requests built from it will fail.
    pub fn backend_base(&self) -> String {
        self.backend_url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .unwrap_or_default()
    }

    /// Configured theme, falling back to the platform preference.
    pub fn initial_theme(&self) -> Theme {
        self.theme.unwrap_or_else(Theme::from_platform)
    }

    pub fn reveal_interval(&self) -> Duration {
        match self.reveal_interval_ms {
            Some(ms) if ms > 0 => Duration::from_millis(ms),
            _ => DEFAULT_REVEAL_INTERVAL,
        }
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("senpai").join("config.json"))
    }
}
