//! Bot configuration and runtime feature toggles.
//!
//! `ModerationConfig` is loaded once at startup; the feature toggles are
//! re-read from disk on every scheduling decision so an external admin
//! surface (or the `/toggle` command) can flip them live.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Default location of the bot configuration file
pub const CONFIG_FILE: &str = "config/bot.yaml";
/// Default location of the feature toggle file
pub const TOGGLES_FILE: &str = "data/toggles.yaml";
/// Default location of the banned word list (one token per line)
pub const BADWORDS_FILE: &str = "data/moderation/badwords.txt";
/// Directory holding the durable analytics counters
pub const ANALYTICS_DIR: &str = "data/analytics";

/// Errors that can occur while reading or writing configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Toggle name not recognized by [`FileToggleStore::set`]
    #[error("Unknown toggle: {0}")]
    UnknownToggle(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Moderation and scheduling tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// Name of the text channel the moderation pipeline watches
    pub general_channel: String,
    /// Name of the text channel receiving structured moderation records
    pub mod_log_channel: String,
    /// Identical in-window messages that count as repeat spam
    pub max_repeat: usize,
    /// Sliding window for flood detection, in seconds
    pub flood_window_secs: i64,
    /// Messages allowed inside the flood window before flood spam fires
    pub max_messages: usize,
    /// Warning count at which a timed mute is applied
    pub max_warnings: u32,
    /// Timed mute duration, in minutes
    pub timeout_minutes: i64,
    /// How long a public warning notice stays up before auto-deletion
    pub warning_notice_ttl_secs: u64,
    /// Delay before a greeting gets its canned reply
    pub greeting_delay_secs: u64,
    /// How long a greeting reply stays up before auto-deletion
    pub greeting_reply_ttl_secs: u64,
    /// Silence breaker sweep period, in seconds
    pub sweep_interval_secs: u64,
    /// How long a silence-breaker message stays up before auto-deletion
    pub silence_notice_ttl_secs: u64,
    /// Daytime inactivity threshold range, in minutes (inclusive)
    pub day_threshold_minutes: (i64, i64),
    /// Night-time inactivity threshold range, in minutes (inclusive)
    pub night_threshold_minutes: (i64, i64),
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            general_channel: "general".to_string(),
            mod_log_channel: "mod-logs".to_string(),
            max_repeat: 3,
            flood_window_secs: 6,
            max_messages: 5,
            max_warnings: 2,
            timeout_minutes: 10,
            warning_notice_ttl_secs: 120,
            greeting_delay_secs: 15,
            greeting_reply_ttl_secs: 300,
            sweep_interval_secs: 300,
            silence_notice_ttl_secs: 600,
            day_threshold_minutes: (20, 40),
            night_threshold_minutes: (90, 120),
        }
    }
}

impl ModerationConfig {
    /// Load the configuration from a YAML file.
    ///
    /// A missing or unreadable file yields the defaults; a partial file is
    /// filled in field by field. Startup never fails on configuration.
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
                warn!("Malformed config file {}: {e}, using defaults", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }
}

/// Process-wide feature toggles, mutated by the admin surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureToggles {
    /// Greeting auto-reply (stored for the admin surface; the message path
    /// does not consult it)
    pub auto_greet: bool,
    /// Reserved toggle, currently unused
    pub auto_question: bool,
    /// Whether the silence breaker sweep runs at all
    pub silence_breaker: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            auto_greet: true,
            auto_question: true,
            silence_breaker: true,
        }
    }
}

/// Source of the current feature toggles.
///
/// The scheduler reads through this once per tick so tests can inject
/// fixed values instead of touching the filesystem.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToggleSource: Send + Sync {
    async fn load(&self) -> FeatureToggles;
}

/// File-backed toggle store. Every read goes back to disk, so edits made
/// by an external process are picked up on the next scheduling decision.
#[derive(Debug, Clone)]
pub struct FileToggleStore {
    path: PathBuf,
}

impl FileToggleStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Flip a single toggle by name and persist the result.
    ///
    /// # Errors
    /// Returns an error if the name is not a known toggle or the file
    /// cannot be written.
    pub async fn set(&self, name: &str, value: bool) -> Result<FeatureToggles, ConfigError> {
        let mut toggles = self.load().await;
        match name {
            "auto_greet" => toggles.auto_greet = value,
            "auto_question" => toggles.auto_question = value,
            "silence_breaker" => toggles.silence_breaker = value,
            other => return Err(ConfigError::UnknownToggle(other.to_string())),
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let yaml = serde_yaml::to_string(&toggles)?;
        tokio::fs::write(&self.path, yaml).await?;
        Ok(toggles)
    }
}

#[async_trait]
impl ToggleSource for FileToggleStore {
    async fn load(&self) -> FeatureToggles {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
                warn!("Malformed toggle file {}: {e}, using defaults", self.path.display());
                FeatureToggles::default()
            }),
            // First run: the file does not exist yet
            Err(_) => FeatureToggles::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("vigil-{}-{name}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_config_defaults_match_moderation_policy() {
        let config = ModerationConfig::default();
        assert_eq!(config.general_channel, "general");
        assert_eq!(config.max_repeat, 3);
        assert_eq!(config.flood_window_secs, 6);
        assert_eq!(config.max_messages, 5);
        assert_eq!(config.max_warnings, 2);
        assert_eq!(config.timeout_minutes, 10);
        assert_eq!(config.day_threshold_minutes, (20, 40));
        assert_eq!(config.night_threshold_minutes, (90, 120));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: ModerationConfig =
            serde_yaml::from_str("general_channel: lobby\nmax_warnings: 5\n")
                .expect("Failed to deserialize");
        assert_eq!(config.general_channel, "lobby");
        assert_eq!(config.max_warnings, 5);
        // Untouched fields keep their defaults
        assert_eq!(config.max_repeat, 3);
        assert_eq!(config.mod_log_channel, "mod-logs");
    }

    #[tokio::test]
    async fn test_missing_config_file_yields_defaults() {
        let config = ModerationConfig::load(temp_path("no-such-config.yaml")).await;
        assert_eq!(config.general_channel, "general");
    }

    #[tokio::test]
    async fn test_toggle_store_defaults_on_first_run() {
        let store = FileToggleStore::new(temp_path("toggles.yaml"));
        let toggles = store.load().await;
        assert!(toggles.auto_greet);
        assert!(toggles.auto_question);
        assert!(toggles.silence_breaker);
    }

    #[tokio::test]
    async fn test_toggle_set_persists_and_reloads() {
        let path = temp_path("toggles.yaml");
        let store = FileToggleStore::new(&path);

        let updated = store.set("silence_breaker", false).await.unwrap();
        assert!(!updated.silence_breaker);
        assert!(updated.auto_greet);

        // A fresh store reading the same file sees the change
        let other = FileToggleStore::new(&path);
        let reloaded = other.load().await;
        assert!(!reloaded.silence_breaker);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_unknown_toggle_rejected() {
        let store = FileToggleStore::new(temp_path("toggles.yaml"));
        let err = store.set("bogus", true).await.unwrap_err();
        assert!(matches!(err, ConfigError::UnknownToggle(name) if name == "bogus"));
    }

    #[tokio::test]
    async fn test_corrupt_toggle_file_yields_defaults() {
        let path = temp_path("toggles.yaml");
        tokio::fs::write(&path, ":: not yaml ::[").await.unwrap();
        let store = FileToggleStore::new(&path);
        assert_eq!(store.load().await, FeatureToggles::default());
        let _ = tokio::fs::remove_file(&path).await;
    }
}
