//! Configuration resolution for Petnook.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (`<config dir>/petnook/settings.json`)
//! 3. Project config (`.petnook/settings.json`)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Complete Petnook configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    /// Rate-limit rules keyed by action name (`login`, `signup`,
    /// `email_verification`). Actions without a rule are never limited.
    #[serde(default = "default_rate_limits")]
    pub rate_limits: BTreeMap<String, RateLimitRule>,
    #[serde(default)]
    pub punishment: PunishmentConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            rate_limits: default_rate_limits(),
            punishment: PunishmentConfig::default(),
            notifications: NotificationConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Look up the rate-limit rule for an action name.
    pub fn rate_limit(&self, action: &str) -> Option<RateLimitRule> {
        self.rate_limits.get(action).copied()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_path: Option<PathBuf>,
}

/// Sliding-window limit for one action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
    pub max_attempts: u32,
    pub window_minutes: u32,
}

impl RateLimitRule {
    pub const fn new(max_attempts: u32, window_minutes: u32) -> Self {
        Self {
            max_attempts,
            window_minutes,
        }
    }

    pub fn window_secs(self) -> i64 {
        i64::from(self.window_minutes) * crate::clock::SECS_PER_MINUTE
    }
}

/// Bounds and retry policy for the punishment state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PunishmentConfig {
    pub max_ban_days: i64,
    pub max_restriction_hours: i64,
    pub max_restriction_days: i64,
    /// How many times a conflicting conditional write is retried.
    pub conflict_retries: u32,
}

impl Default for PunishmentConfig {
    fn default() -> Self {
        Self {
            max_ban_days: 365,
            max_restriction_hours: 720,
            max_restriction_days: 90,
            conflict_retries: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Identical admin notifications within this many seconds are dropped.
    pub dedup_window_secs: i64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            dedup_window_secs: 5,
        }
    }
}

fn default_rate_limits() -> BTreeMap<String, RateLimitRule> {
    BTreeMap::from([
        ("login".to_string(), RateLimitRule::new(5, 15)),
        ("signup".to_string(), RateLimitRule::new(3, 60)),
        ("email_verification".to_string(), RateLimitRule::new(3, 60)),
    ])
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load configuration with hierarchical resolution.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            let global = load_config_file(&global_path)?;
            merge_config(&mut config, global);
        }
    }

    if let Some(dir) = project_dir {
        let project_path = dir.join(".petnook").join("settings.json");
        if project_path.exists() {
            let project = load_config_file(&project_path)?;
            merge_config(&mut config, project);
        }
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("petnook").join("settings.json"))
}

/// Default location of the moderation database.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("petnook").join("moderation.db"))
}

/// Read a single settings file.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: Config) {
    if overlay.storage.database_path.is_some() {
        base.storage.database_path = overlay.storage.database_path;
    }
    // A settings file owns the whole rule table; dropping an entry disables
    // limiting for that action.
    base.rate_limits = overlay.rate_limits;
    base.punishment = overlay.punishment;
    base.notifications = overlay.notifications;
    base.log_level = overlay.log_level;
}

fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("PETNOOK_DB_PATH") {
        config.storage.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("PETNOOK_LOG_LEVEL") {
        config.log_level = val;
    }
    if let Some(val) = lookup("PETNOOK_NOTIFICATION_DEDUP_SECS") {
        if let Ok(n) = val.parse() {
            config.notifications.dedup_window_secs = n;
        }
    }
}
