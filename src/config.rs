//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[search]` section: tag index settings
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSection {
    /// Minimum seconds between read replica refreshes
    #[serde(default = "default_snapshot_window")]
    pub snapshot_window_secs: u64,
}

fn default_snapshot_window() -> u64 {
    20
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            snapshot_window_secs: default_snapshot_window(),
        }
    }
}

impl SearchSection {
    /// Runtime configuration for a `Search`
    pub fn to_runtime(&self) -> crate::search::SearchConfig {
        crate::search::SearchConfig::with_window(Duration::from_secs(self.snapshot_window_secs))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    ///
    /// An override the index cannot run with is dropped in favour of the
    /// default value.
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        if let Err(e) = config.validate() {
            tracing::warn!("{}; using {}s", e, default_snapshot_window());
            config.search.snapshot_window_secs = default_snapshot_window();
        }
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("tagsearch").join("config.toml")),
            Some(PathBuf::from("/etc/tagsearch/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Reject settings the index cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.snapshot_window_secs == 0 {
            return Err(ConfigError::Invalid(
                "search.snapshot_window_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(window) = std::env::var("TAGSEARCH_SNAPSHOT_WINDOW_SECS") {
            match window.parse() {
                Ok(secs) => self.search.snapshot_window_secs = secs,
                Err(_) => tracing::warn!(
                    "Ignoring TAGSEARCH_SNAPSHOT_WINDOW_SECS={:?}: not a number",
                    window
                ),
            }
        }

        if let Ok(level) = std::env::var("TAGSEARCH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("TAGSEARCH_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# tagsearch configuration
#
# Environment variables override these settings:
# - TAGSEARCH_SNAPSHOT_WINDOW_SECS
# - TAGSEARCH_LOG_LEVEL
# - TAGSEARCH_LOG_FORMAT

[search]
# Minimum seconds between read replica refreshes.
# Queries may be up to this stale relative to ingestion.
snapshot_window_secs = 20

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/tagsearch/tagsearch.log"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.search.snapshot_window_secs, 20);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(
            config.search.to_runtime().snapshot_window,
            Duration::from_secs(20)
        );
    }

    #[test]
    fn test_generated_default_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.search.snapshot_window_secs, 20);
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[search]\nsnapshot_window_secs = 5").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.search.snapshot_window_secs, 5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[search]\nsnapshot_window_secs = 0").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_env_zero_window_falls_back_to_default() {
        std::env::set_var("TAGSEARCH_SNAPSHOT_WINDOW_SECS", "0");
        let config = Config::from_env();
        std::env::remove_var("TAGSEARCH_SNAPSHOT_WINDOW_SECS");

        assert_eq!(config.search.snapshot_window_secs, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[search\nsnapshot_window_secs = ").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/tagsearch.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
