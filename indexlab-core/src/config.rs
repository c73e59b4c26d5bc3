//! Serializable loader configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config.

use crate::data::provider::DataError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MEMBERSHIP_URL: &str =
    "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies";
pub const DEFAULT_CHART_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Configuration for a [`DatasetLoader`](crate::loader::DatasetLoader) session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoaderConfig {
    /// Directory persisted tables are written to. Created at startup.
    pub data_dir: PathBuf,
    /// Prefix of every persisted filename, e.g. `S&P500-raw_prices.csv`.
    pub file_prefix: String,
    /// Symbol appended to the index members.
    pub benchmark: String,
    /// Reference page listing the index members.
    pub membership_url: String,
    /// Chart API endpoint; the symbol is appended as a path segment.
    pub chart_base_url: String,
    pub http_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("Data"),
            file_prefix: "S&P500".into(),
            benchmark: "SPY".into(),
            membership_url: DEFAULT_MEMBERSHIP_URL.into(),
            chart_base_url: DEFAULT_CHART_BASE_URL.into(),
            http_timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into(),
        }
    }
}

impl LoaderConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DataError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, DataError> {
        let config: Self =
            toml::from_str(content).map_err(|e| DataError::Config(format!("parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no session could run with.
    pub fn validate(&self) -> Result<(), DataError> {
        if self.benchmark.trim().is_empty() {
            return Err(DataError::Config("benchmark must not be empty".into()));
        }
        Ok(())
    }

    /// Serialize the config to TOML.
    pub fn to_toml(&self) -> Result<String, DataError> {
        toml::to_string_pretty(self).map_err(|e| DataError::Config(format!("serialize: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg = LoaderConfig::from_toml("").unwrap();
        assert_eq!(cfg, LoaderConfig::default());
        assert_eq!(cfg.benchmark, "SPY");
        assert_eq!(cfg.data_dir, PathBuf::from("Data"));
    }

    #[test]
    fn partial_override() {
        let cfg = LoaderConfig::from_toml(
            r#"
            data_dir = "out"
            benchmark = "QQQ"
            http_timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("out"));
        assert_eq!(cfg.benchmark, "QQQ");
        assert_eq!(cfg.http_timeout_secs, 5);
        assert_eq!(cfg.file_prefix, "S&P500");
    }

    #[test]
    fn toml_roundtrip() {
        let cfg = LoaderConfig::default();
        let parsed = LoaderConfig::from_toml(&cfg.to_toml().unwrap()).unwrap();
        assert_eq!(cfg, parsed);
    }

    #[test]
    fn malformed_toml_is_config_error() {
        assert!(matches!(
            LoaderConfig::from_toml("data_dir = ["),
            Err(DataError::Config(_))
        ));
    }

    #[test]
    fn blank_benchmark_is_config_error() {
        assert!(matches!(
            LoaderConfig::from_toml("benchmark = \" \""),
            Err(DataError::Config(_))
        ));
    }
}
