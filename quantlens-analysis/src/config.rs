//! TOML configuration: which provider to use and request defaults.
//!
//! ```toml
//! [provider]
//! source = "csv"
//! csv_dir = "data/bars"
//! cache_ttl_secs = 300
//!
//! [defaults]
//! period = "6mo"
//! interval = "1d"
//! alpha = 0.01
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use quantlens_core::data::{CachedProvider, CsvProvider, DataError, DataProvider, SyntheticProvider, YahooProvider, YahooSettings};
use quantlens_core::domain::{Interval, Period};

use crate::hypothesis::DEFAULT_ALPHA;

/// Largest accepted `provider.max_retries`.
pub const MAX_RETRIES: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("unknown provider source '{0}' (expected yahoo, csv or synthetic)")]
    UnknownSource(String),

    #[error("provider setup failed: {0}")]
    Provider(#[from] DataError),
}

/// Where bars come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderSource {
    #[default]
    Yahoo,
    Csv,
    Synthetic,
}

impl ProviderSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderSource::Yahoo => "yahoo",
            ProviderSource::Csv => "csv",
            ProviderSource::Synthetic => "synthetic",
        }
    }
}

impl FromStr for ProviderSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yahoo" => Ok(ProviderSource::Yahoo),
            "csv" => Ok(ProviderSource::Csv),
            "synthetic" => Ok(ProviderSource::Synthetic),
            other => Err(ConfigError::UnknownSource(other.to_string())),
        }
    }
}

impl fmt::Display for ProviderSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub source: ProviderSource,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    /// Required when `source = "csv"`.
    pub csv_dir: Option<PathBuf>,
    /// 0 disables the fetch cache.
    pub cache_ttl_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            source: ProviderSource::default(),
            timeout_secs: 30,
            max_retries: 3,
            base_delay_ms: 500,
            csv_dir: None,
            cache_ttl_secs: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestDefaults {
    pub period: Period,
    pub interval: Interval,
    pub alpha: f64,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            period: Period::default(),
            interval: Interval::default(),
            alpha: DEFAULT_ALPHA,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantLensConfig {
    pub provider: ProviderConfig,
    pub defaults: RequestDefaults,
}

impl QuantLensConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let alpha = self.defaults.alpha;
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "defaults.alpha must lie strictly between 0 and 1, got {alpha}"
            )));
        }
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::Invalid("provider.timeout_secs must be positive".into()));
        }
        if self.provider.max_retries > MAX_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "provider.max_retries must be at most {MAX_RETRIES}, got {}",
                self.provider.max_retries
            )));
        }
        if self.provider.source == ProviderSource::Csv && self.provider.csv_dir.is_none() {
            return Err(ConfigError::Invalid("provider.csv_dir is required for the csv source".into()));
        }
        Ok(())
    }

    pub fn yahoo_settings(&self) -> YahooSettings {
        YahooSettings {
            timeout: Duration::from_secs(self.provider.timeout_secs),
            max_retries: self.provider.max_retries,
            base_delay: Duration::from_millis(self.provider.base_delay_ms),
            ..YahooSettings::default()
        }
    }

    /// Construct the configured provider, wrapped in the TTL cache when
    /// `cache_ttl_secs > 0`.
    pub fn build_provider(&self) -> Result<Box<dyn DataProvider>, ConfigError> {
        self.validate()?;
        let provider: Box<dyn DataProvider> = match self.provider.source {
            ProviderSource::Yahoo => Box::new(YahooProvider::new(self.yahoo_settings())?),
            ProviderSource::Csv => {
                let dir = self
                    .provider
                    .csv_dir
                    .clone()
                    .ok_or_else(|| ConfigError::Invalid("provider.csv_dir is required for the csv source".into()))?;
                Box::new(CsvProvider::new(dir))
            }
            ProviderSource::Synthetic => Box::new(SyntheticProvider::new()),
        };
        info!(source = %self.provider.source, cache_ttl_secs = self.provider.cache_ttl_secs, "provider ready");

        if self.provider.cache_ttl_secs > 0 {
            let ttl = Duration::from_secs(self.provider.cache_ttl_secs);
            return Ok(Box::new(CachedProvider::new(provider, ttl)));
        }
        Ok(provider)
    }
}
