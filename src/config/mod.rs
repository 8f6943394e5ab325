//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable prefix, e.g. `TEKKEN_STATS__DATA_DIR`.
pub const ENV_PREFIX: &str = "TEKKEN_STATS";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to load config: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Battle ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Only ranked battles feed character stats
    #[serde(default = "default_ranked_only")]
    pub ranked_only: bool,
}

fn default_ranked_only() -> bool {
    true
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            ranked_only: default_ranked_only(),
        }
    }
}

/// Leaderboard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    /// Minimum battles for a character to appear in win-rate rankings
    #[serde(default = "default_min_battles")]
    pub min_battles: u64,
}

fn default_min_battles() -> u64 {
    100
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            min_battles: default_min_battles(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// TOML file extending the built-in character and dan rank names
    #[serde(default)]
    pub enums_file: Option<PathBuf>,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            enums_file: None,
            ingest: IngestConfig::default(),
            leaderboard: LeaderboardConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an optional TOML file overlaid with
    /// `TEKKEN_STATS__*` environment variables (`__` separates nested keys).
    ///
    /// A missing file is not an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "data_dir must not be empty".to_string(),
            ));
        }

        if self.log_level.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "log_level must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.log_level, "info");
        assert!(config.ingest.ranked_only);
        assert_eq!(config.leaderboard.min_battles, 100);
        assert!(config.enums_file.is_none());
    }

    #[test]
    fn test_config_validation_ok() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_empty_data_dir() {
        let mut config = AppConfig::default();
        config.data_dir = PathBuf::new();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_log_level() {
        let mut config = AppConfig::default();
        config.log_level = "  ".to_string();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.data_dir, parsed.data_dir);
        assert_eq!(config.leaderboard.min_battles, parsed.leaderboard.min_battles);
    }

    #[test]
    fn test_from_file_partial() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
data_dir = "/srv/ladder"

[ingest]
ranked_only = false
"#,
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/ladder"));
        assert!(!config.ingest.ranked_only);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_from_file_missing() {
        let temp_dir = TempDir::new().unwrap();
        let result = AppConfig::from_file(&temp_dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }

    #[test]
    fn test_load_layers_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "log_level = \"debug\"\nenums_file = \"names.toml\"\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.enums_file, Some(PathBuf::from("names.toml")));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::load(&temp_dir.path().join("absent.toml")).unwrap();
        assert!(config.ingest.ranked_only);
    }
}
