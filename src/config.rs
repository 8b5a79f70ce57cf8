//! TOML application config.
//!
//! Every section and field has a default, so an empty or missing file is a
//! valid configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_NUM_SIMULATIONS, HISTOGRAM_BINS, LOCAL_ENGINE_URL, MAX_SCATTER_SAMPLES,
    PREVIEW_SAMPLE_COUNT,
};
use crate::engine::LocalEngineConfig;
use crate::prelude::Result;
use crate::{BaseUrl, Error};

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Read `path`, or defaults if it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn local_engine(&self) -> LocalEngineConfig {
        LocalEngineConfig {
            histogram_bins: self.simulation.histogram_bins,
            preview_samples: self.simulation.preview_samples,
            max_scatter_samples: self.simulation.max_scatter_samples,
            seed: self.simulation.seed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EngineMode {
    /// Remote engine at `base_url`
    #[default]
    Http,
    /// In-process reference engine
    Local,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub mode: EngineMode,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout; 0 disables it
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    LOCAL_ENGINE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: EngineMode::default(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EngineConfig {
    pub fn base_url(&self) -> BaseUrl {
        BaseUrl::from(self.base_url.as_str())
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StoreConfig {
    /// Directory holding saved scenarios
    #[serde(default = "default_store_dir")]
    pub dir: String,
}

fn default_store_dir() -> String {
    "data/scenarios".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SimulationConfig {
    /// Trial count for new scenarios
    #[serde(default = "default_trials")]
    pub default_trials: u32,
    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,
    #[serde(default = "default_preview_samples")]
    pub preview_samples: usize,
    #[serde(default = "default_max_scatter_samples")]
    pub max_scatter_samples: usize,
    /// Seed for the local engine
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_trials() -> u32 {
    DEFAULT_NUM_SIMULATIONS
}

fn default_histogram_bins() -> usize {
    HISTOGRAM_BINS
}

fn default_preview_samples() -> usize {
    PREVIEW_SAMPLE_COUNT
}

fn default_max_scatter_samples() -> usize {
    MAX_SCATTER_SAMPLES
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            default_trials: default_trials(),
            histogram_bins: default_histogram_bins(),
            preview_samples: default_preview_samples(),
            max_scatter_samples: default_max_scatter_samples(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: pretty, json, compact
    #[serde(default)]
    pub format: LogFormat,
    /// Optional log file path (logs to both file and stdout)
    #[serde(default)]
    pub log_file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
            LogFormat::Compact => "compact",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.simulation.default_trials, 10_000);
        assert_eq!(config.engine.base_url().get_url(), LOCAL_ENGINE_URL);
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::from_toml(
            r#"
[engine]
mode = "local"
timeout_secs = 0

[simulation]
histogram_bins = 40
seed = 99
"#,
        )
        .unwrap();
        assert_eq!(config.engine.mode, EngineMode::Local);
        assert_eq!(config.engine.timeout(), None);
        assert_eq!(config.simulation.preview_samples, PREVIEW_SAMPLE_COUNT);

        let local = config.local_engine();
        assert_eq!(local.histogram_bins, 40);
        assert_eq!(local.seed, Some(99));
    }

    #[test]
    fn test_generated_config_parses_back() {
        let text = AppConfig::default().to_toml().unwrap();
        assert_eq!(AppConfig::from_toml(&text).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_bad_config_is_config_error() {
        let err = AppConfig::from_toml("[engine]\nmode = \"carrier-pigeon\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("montecarlo_config_does_not_exist.toml");
        assert_eq!(AppConfig::load(path).unwrap(), AppConfig::default());
    }
}
