use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::prompts::DEFAULT_MODEL;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API key stored by `chingu set-key`
    pub api_key: Option<String>,

    /// Model used for every request
    pub default_model: String,

    /// Base URL of the Mistral API
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// TOML secrets files searched for the API key, in order
    pub secrets_files: Vec<PathBuf>,

    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,

    /// UI preferences
    pub ui: UiConfig,

    /// Chingu home directory
    #[serde(skip)]
    pub chingu_home: PathBuf,
}

/// UI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub show_timestamps: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_timestamps: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let chingu_home = default_home();

        Config {
            api_key: None,
            default_model: DEFAULT_MODEL.to_string(),
            base_url: "https://api.mistral.ai".to_string(),
            api_key_env: "MISTRAL_API_KEY".to_string(),
            secrets_files: vec![
                PathBuf::from(".chingu").join("secrets.toml"),
                chingu_home.join("secrets.toml"),
            ],
            request_timeout_secs: 60,
            ui: UiConfig::default(),
            chingu_home,
        }
    }
}

fn default_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".chingu")
}

impl Config {
    /// Load configuration from `~/.chingu/config.toml`
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let chingu_home = home.join(".chingu");
        let mut config = Self::load_from(&chingu_home.join("config.toml"))?;
        config.chingu_home = chingu_home;
        Ok(config)
    }

    /// Load configuration from an explicit path, falling back to defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            Config::default()
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                config.chingu_home = parent.to_path_buf();
            }
        }

        Ok(config)
    }

    pub fn config_path(&self) -> PathBuf {
        self.chingu_home.join("config.toml")
    }

    pub fn log_path(&self) -> PathBuf {
        self.chingu_home.join("chingu.log")
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.chingu_home)
            .context("Failed to create .chingu directory")?;
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(self.config_path(), content)
            .context("Failed to write config file")?;
        Ok(())
    }

    /// Update API key
    pub fn set_api_key(&mut self, key: String) {
        self.api_key = Some(key);
    }
}
