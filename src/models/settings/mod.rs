// Settings module
// Application configuration loaded from TOML

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::countdown::DEFAULT_IMAGE_BASE_URL;

/// Which slot backend holds the watch progress payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
    Memory,
}

/// Timer cadence and notification settings for release countdowns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountdownConfig {
    pub catalog_poll_secs: u64,
    pub tick_secs: u64,
    pub auto_hide_secs: u64,
    pub notification_secs: u64,
    pub desktop_notifications: bool,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            catalog_poll_secs: 30,
            tick_secs: 1,
            auto_hide_secs: 5 * 60,
            notification_secs: 10,
            desktop_notifications: true,
        }
    }
}

impl CountdownConfig {
    pub fn catalog_poll_interval(&self) -> Duration {
        Duration::from_secs(self.catalog_poll_secs.max(1))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_secs.max(1))
    }

    pub fn auto_hide_after(&self) -> Duration {
        Duration::from_secs(self.auto_hide_secs)
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_secs(self.notification_secs)
    }
}

/// Completion and retention rules for the watch progress store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Percentage at or above which a record is marked completed.
    pub completion_threshold: f64,
    /// Completed records older than this are pruned on the next save.
    pub completed_retention_days: i64,
    pub continue_watching_days: i64,
    pub continue_watching_limit: usize,
}

/// Longest retention or continue-watching window accepted from config.
pub const MAX_WINDOW_DAYS: i64 = 36_500;

impl ProgressConfig {
    /// Rejects thresholds outside `[0, 100]` and day windows outside
    /// `0..=MAX_WINDOW_DAYS`.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=100.0).contains(&self.completion_threshold),
            "progress.completion_threshold must be between 0 and 100, got {}",
            self.completion_threshold
        );
        for (name, days) in [
            ("completed_retention_days", self.completed_retention_days),
            ("continue_watching_days", self.continue_watching_days),
        ] {
            ensure!(
                (0..=MAX_WINDOW_DAYS).contains(&days),
                "progress.{} must be between 0 and {}, got {}",
                name,
                MAX_WINDOW_DAYS,
                days
            );
        }
        Ok(())
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            completion_threshold: 80.0,
            completed_retention_days: 7,
            continue_watching_days: 30,
            continue_watching_limit: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub image_base_url: String,
    pub storage_backend: StorageBackend,
    /// Overrides the platform data directory for slot files.
    pub data_dir: Option<PathBuf>,
    pub countdown: CountdownConfig,
    pub progress: ProgressConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".to_string(),
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
            storage_backend: StorageBackend::default(),
            data_dir: None,
            countdown: CountdownConfig::default(),
            progress: ProgressConfig::default(),
        }
    }
}

impl AppConfig {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "TavernaStream", "TavernaStream")
    }

    /// Default location of `config.toml` for this platform.
    pub fn default_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Loads the config at `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        Self::from_toml(&data)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Loads from `path` if given, otherwise from the platform default location.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_path() {
                Some(default_path) => Self::load(&default_path),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn from_toml(data: &str) -> Result<Self> {
        let config: Self = toml::from_str(data)?;
        config.progress.validate()?;
        Ok(config)
    }

    /// Directory holding slot files and the SQLite database.
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }

        Self::project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .context("Failed to determine the platform data directory")
    }
}
