use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_FEED_URL: &str = "https://finans.truncgil.com/v4/today.json";
pub const DEFAULT_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct FeedsConfig {
    pub default_url: String,
    pub timeout_secs: u64,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        FeedsConfig {
            default_url: DEFAULT_FEED_URL.to_string(),
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct NotificationsConfig {
    pub push_url: String,
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        NotificationsConfig {
            push_url: DEFAULT_PUSH_URL.to_string(),
            access_token: None,
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RemindersConfig {
    pub cooldown_minutes: u64,
}

impl Default for RemindersConfig {
    fn default() -> Self {
        RemindersConfig {
            cooldown_minutes: 24 * 60,
        }
    }
}

impl RemindersConfig {
    pub fn cooldown(&self) -> Option<Duration> {
        (self.cooldown_minutes > 0).then(|| Duration::from_secs(self.cooldown_minutes * 60))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RetentionConfig {
    pub commit_chunk_size: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        RetentionConfig {
            commit_chunk_size: 500,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub data_path: Option<String>,
    pub feeds: FeedsConfig,
    pub notifications: NotificationsConfig,
    pub reminders: RemindersConfig,
    pub retention: RetentionConfig,
}

impl AppConfig {
    /// Loads the config from the default location, falling back to defaults
    /// when no file exists there yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("app", "ledger", "ledger-jobs")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("app", "ledger", "ledger-jobs")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
