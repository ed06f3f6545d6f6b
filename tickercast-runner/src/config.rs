//! Serializable run configuration.
//!
//! Loaded from a TOML file; every field has a sensible default so a partial
//! (or absent) config file still yields a working pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tickercast_core::forecast::ModelOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Allowed forecast horizon range, expressed in whole years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HorizonBounds {
    pub min_years: u32,
    pub max_years: u32,
}

impl Default for HorizonBounds {
    fn default() -> Self {
        Self {
            min_years: 1,
            max_years: 4,
        }
    }
}

impl HorizonBounds {
    pub fn contains(&self, years: u32) -> bool {
        years >= self.min_years && years <= self.max_years
    }
}

/// Configuration for a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Path to the symbol catalog CSV (`symbol`/`name` columns).
    pub catalog: PathBuf,

    /// History cache directory.
    pub cache_dir: PathBuf,

    /// Artifact output directory.
    pub output_dir: PathBuf,

    /// How many years of history to fetch for training.
    pub history_years: u32,

    pub horizon: HorizonBounds,

    pub model: ModelOptions,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from("symbols.csv"),
            cache_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("results"),
            history_years: 5,
            horizon: HorizonBounds::default(),
            model: ModelOptions::default(),
        }
    }
}

impl RunConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = RunConfig::default();
        assert_eq!(config.horizon.min_years, 1);
        assert_eq!(config.horizon.max_years, 4);
        assert_eq!(config.model.trend_flexibility, 0.1);
        assert!(config.model.yearly_seasonality);
        assert!(config.model.weekly_seasonality);
        assert!(!config.model.daily_seasonality);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config = RunConfig::from_toml(
            r#"
            catalog = "indian_stocks.csv"

            [model]
            trend_flexibility = 0.25
            "#,
        )
        .unwrap();

        assert_eq!(config.catalog, PathBuf::from("indian_stocks.csv"));
        assert_eq!(config.cache_dir, PathBuf::from("data"));
        assert_eq!(config.model.trend_flexibility, 0.25);
        // Unspecified model fields keep their defaults.
        assert!(config.model.weekly_seasonality);
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let config = RunConfig::from_toml("").unwrap();
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let err = RunConfig::from_toml("catalog = [not valid").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn horizon_bounds_check() {
        let bounds = HorizonBounds::default();
        assert!(!bounds.contains(0));
        assert!(bounds.contains(1));
        assert!(bounds.contains(4));
        assert!(!bounds.contains(5));
    }

    #[test]
    fn toml_roundtrip() {
        let config = RunConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed = RunConfig::from_toml(&serialized).unwrap();
        assert_eq!(config, parsed);
    }
}
