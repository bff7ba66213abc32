//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files with environment
//! variable overrides for data locations.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::data::DataSourceKind;
use crate::types::BreakoutThresholds;

pub const ENV_DATA_DIR: &str = "BREAKOUT_DATA_DIR";
pub const ENV_RESULTS_DIR: &str = "BREAKOUT_RESULTS_DIR";
pub const ENV_DATA_SOURCE: &str = "BREAKOUT_DATA_SOURCE";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub data: DataConfig,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        config.apply_env()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise start from defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            return Self::from_file(path);
        }

        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override data settings from the environment
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            self.data.data_dir = dir;
        }
        if let Ok(dir) = std::env::var(ENV_RESULTS_DIR) {
            self.data.results_dir = dir;
        }
        if let Ok(source) = std::env::var(ENV_DATA_SOURCE) {
            self.data.source = source
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context(format!("Invalid {}", ENV_DATA_SOURCE))?;
        }
        Ok(())
    }
}

/// Default breakout parameters, overridable per run on the command line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub volume_threshold_pct: f64,
    pub price_threshold_pct: f64,
    pub holding_period: usize,
    /// Calendar days of history when no start date is given
    pub lookback_days: i64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let thresholds = BreakoutThresholds::default();
        AnalysisConfig {
            volume_threshold_pct: thresholds.volume_threshold_pct,
            price_threshold_pct: thresholds.price_threshold_pct,
            holding_period: thresholds.holding_period,
            lookback_days: 365,
        }
    }
}

impl AnalysisConfig {
    pub fn thresholds(&self) -> BreakoutThresholds {
        BreakoutThresholds {
            volume_threshold_pct: self.volume_threshold_pct,
            price_threshold_pct: self.price_threshold_pct,
            holding_period: self.holding_period,
        }
    }
}

/// Data source and output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub source: DataSourceKind,
    pub data_dir: String,
    pub results_dir: String,
    pub request_timeout_secs: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            source: DataSourceKind::Yahoo,
            data_dir: "data".to_string(),
            results_dir: "results".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl DataConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.analysis.volume_threshold_pct, 200.0);
        assert_eq!(config.analysis.price_threshold_pct, 2.0);
        assert_eq!(config.analysis.holding_period, 10);
        assert_eq!(config.analysis.lookback_days, 365);
        assert_eq!(config.data.source, DataSourceKind::Yahoo);
        assert_eq!(config.data.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(
            r#"{ "analysis": { "holding_period": 5 }, "data": { "source": "csv" } }"#,
        )
        .unwrap();

        assert_eq!(config.analysis.holding_period, 5);
        assert_eq!(config.analysis.volume_threshold_pct, 200.0);
        assert_eq!(config.data.source, DataSourceKind::Csv);
        assert_eq!(config.data.data_dir, "data");

        let thresholds = config.analysis.thresholds();
        assert_eq!(thresholds.holding_period, 5);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "analysis": {{ "price_threshold_pct": 3.5 }}, "data": {{ "results_dir": "out" }} }}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.analysis.price_threshold_pct, 3.5);
        assert!(config.analysis.lookback_days > 0);
    }

    #[test]
    fn test_from_file_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }
}
