//! Configuration settings and validation.

use crate::storage::OpenOptions;
use crate::{Error, Result};
use std::path::PathBuf;

/// Main configuration for symdb.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the `SQLite` database file.
    pub database_path: PathBuf,

    /// Open the database without write access.
    pub read_only: bool,

    /// Create the database file if it does not exist.
    pub create: bool,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON.
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./symbols.db"),
            read_only: false,
            create: true,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::config("database path cannot be empty"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    /// Options for opening the database.
    #[must_use]
    pub const fn open_options(&self) -> OpenOptions {
        OpenOptions {
            read_only: self.read_only,
            create: self.create && !self.read_only,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database_path, PathBuf::from("./symbols.db"));
        assert!(config.create);
        assert!(!config.read_only);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_new() {
        let config = Config::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_path() {
        let config = Config {
            database_path: PathBuf::new(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("database path"));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let config = Config {
            log_level: "invalid".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log level"));
    }

    #[test]
    fn test_log_level_case_insensitive() {
        for level in ["TRACE", "Debug", "INFO", "Warn", "ERROR"] {
            let config = Config {
                log_level: level.to_string(),
                ..Default::default()
            };
            assert!(
                config.validate().is_ok(),
                "Level '{level}' should be valid (case insensitive)"
            );
        }
    }

    #[test]
    fn test_read_only_never_creates() {
        let config = Config {
            read_only: true,
            create: true,
            ..Default::default()
        };
        assert_eq!(config.open_options(), OpenOptions::read_only());
    }

    #[test]
    fn test_open_options_read_write() {
        assert_eq!(Config::default().open_options(), OpenOptions::read_write());
    }
}
