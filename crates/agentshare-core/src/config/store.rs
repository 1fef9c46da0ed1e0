//! Config store for loading and saving `config.json`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};

use super::AppConfig;

const CONFIG_FILE: &str = "config.json";
const LEGACY_CONFIG_FILE: &str = "config";
const LEGACY_LANGUAGE_PREFIX: &str = "LANGUAGE=";

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_dir: PathBuf,
}

impl ConfigStore {
    /// Store rooted at the platform config directory (`~/.config/agentshare`
    /// on Linux).
    pub fn from_env(home_dir: &Path) -> Self {
        let config_dir = dirs::config_dir()
            .map(|p| p.join("agentshare"))
            .unwrap_or_else(|| home_dir.join(".config").join("agentshare"));
        Self::new(config_dir)
    }

    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    fn legacy_path(&self) -> PathBuf {
        self.config_dir.join(LEGACY_CONFIG_FILE)
    }

    /// Load the config, falling back to defaults when it is missing or
    /// unreadable.
    pub fn load(&self) -> AppConfig {
        match self.try_load() {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    path = %self.config_path().display(),
                    error = %e,
                    "Ignoring unreadable config"
                );
                AppConfig::new()
            }
        }
    }

    /// Load the config, migrating a legacy `LANGUAGE=` file on first read.
    pub fn try_load(&self) -> anyhow::Result<AppConfig> {
        let path = self.config_path();
        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            if content.trim().is_empty() {
                return Ok(AppConfig::new());
            }
            return serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()));
        }

        let legacy = self.legacy_path();
        if legacy.is_file() {
            let content = std::fs::read_to_string(&legacy).with_context(|| {
                format!("Failed to read legacy config file: {}", legacy.display())
            })?;
            if let Some(language) = legacy_language(&content) {
                let config = AppConfig {
                    language: Some(language),
                    ..AppConfig::default()
                };
                self.save(&config)?;
                info!(path = %path.display(), "Migrated legacy config");
                return Ok(config);
            }
        }
        Ok(AppConfig::new())
    }

    pub fn save(&self, config: &AppConfig) -> anyhow::Result<()> {
        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize config to JSON")?;
        std::fs::create_dir_all(&self.config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.config_dir.display()
            )
        })?;
        let path = self.config_path();
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}

fn legacy_language(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| line.strip_prefix(LEGACY_LANGUAGE_PREFIX))
        .map(|value| value.trim().to_string())
}
