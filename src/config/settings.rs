//! Application settings loaded from `config.toml`.
//!
//! Every section is optional; missing keys fall back to defaults so a bare
//! deployment only needs `DATABASE_URL` in its environment.

use crate::config::database::DEFAULT_DATABASE_URL;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Environment variable selecting an alternative configuration file.
pub const CONFIG_PATH_ENV: &str = "LEADTRACK_CONFIG";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Database connection settings
    pub database: DatabaseSettings,
    /// Reminder sweep settings
    pub scheduler: SchedulerSettings,
    /// Outgoing notification settings
    pub notifications: NotificationSettings,
}

/// `[database]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Connection URL, overridden by `DATABASE_URL`
    pub url: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

/// `[scheduler]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Whether the periodic reminder sweep runs at all
    pub enabled: bool,
    /// Seconds between sweeps
    pub interval_secs: u64,
    /// Fire ticks on interval boundaries of the wall clock (on the minute by default)
    pub align_to_minute: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
            align_to_minute: true,
        }
    }
}

impl SchedulerSettings {
    /// Sweep cadence as a [`Duration`], never shorter than one second.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// `[notifications]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Sender address on reminder messages
    pub from_address: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            from_address: "noreply@crm.local".to_string(),
        }
    }
}

/// Loads application configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A key has the wrong type
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    parse_config(&contents)
}

/// Parses configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from `LEADTRACK_CONFIG` or `./config.toml`.
///
/// A missing default file is not an error: built-in defaults are used instead.
/// A path named explicitly through the environment must exist.
pub fn load_default_config() -> Result<AppConfig> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return load_config(path);
    }

    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        load_config(DEFAULT_CONFIG_PATH)
    } else {
        info!("No {DEFAULT_CONFIG_PATH} found, using built-in defaults.");
        Ok(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [database]
            url = "sqlite::memory:"

            [scheduler]
            enabled = false
            interval_secs = 30
            align_to_minute = false

            [notifications]
            from_address = "crm@example.co.ke"
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.database.url, "sqlite::memory:");
        assert!(!config.scheduler.enabled);
        assert_eq!(config.scheduler.interval(), Duration::from_secs(30));
        assert!(!config.scheduler.align_to_minute);
        assert_eq!(config.notifications.from_address, "crm@example.co.ke");
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = parse_config("[scheduler]\ninterval_secs = 120\n").unwrap();
        assert_eq!(config.database.url, DEFAULT_DATABASE_URL);
        assert!(config.scheduler.enabled);
        assert!(config.scheduler.align_to_minute);
        assert_eq!(config.scheduler.interval_secs, 120);
        assert_eq!(config.notifications.from_address, "noreply@crm.local");
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = parse_config("[scheduler]\ninterval_secs = 0\n").unwrap();
        assert_eq!(config.scheduler.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = parse_config("[scheduler\nenabled = yes");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let result = load_config("definitely/not/here/config.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
