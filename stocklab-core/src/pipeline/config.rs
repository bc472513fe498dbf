//! Serializable pipeline configuration.
//!
//! Every window and threshold the pipeline uses lives here. The defaults
//! reproduce the standard column set: SMA_20, EMA_20, Bollinger(20, 2) and RSI_14
//! over closes cleaned at 3 standard deviations.

use crate::cleaning::{ZScoreBasis, DEFAULT_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// What to do with a ticker whose dates are not strictly increasing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPolicy {
    /// Sort by date and keep the first row of each repeated date.
    #[default]
    Sort,
    /// Skip the ticker and report it as failed.
    Reject,
}

/// Outlier filter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// Mask values more than this many standard deviations from the mean.
    pub threshold: f64,
    pub basis: ZScoreBasis,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            basis: ZScoreBasis::default(),
        }
    }
}

/// Indicator windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub sma_window: usize,
    pub ema_window: usize,
    pub bollinger_window: usize,
    /// Band width in standard deviations.
    pub bollinger_k: f64,
    pub rsi_window: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma_window: 20,
            ema_window: 20,
            bollinger_window: 20,
            bollinger_k: 2.0,
            rsi_window: 14,
        }
    }
}

/// Full configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub order_policy: OrderPolicy,
    /// Process tickers on the rayon thread pool.
    pub parallel: bool,
    pub outlier: OutlierConfig,
    pub indicators: IndicatorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            order_policy: OrderPolicy::default(),
            parallel: true,
            outlier: OutlierConfig::default(),
            indicators: IndicatorConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a config from a TOML file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
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

    /// Serialize the config to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ind = &self.indicators;
        for (name, window) in [
            ("sma_window", ind.sma_window),
            ("ema_window", ind.ema_window),
            ("bollinger_window", ind.bollinger_window),
            ("rsi_window", ind.rsi_window),
        ] {
            if window == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be >= 1")));
            }
        }
        if !(ind.bollinger_k.is_finite() && ind.bollinger_k > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "bollinger_k must be finite and positive, got {}",
                ind.bollinger_k
            )));
        }
        if !(self.outlier.threshold.is_finite() && self.outlier.threshold > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "outlier threshold must be finite and positive, got {}",
                self.outlier.threshold
            )));
        }
        Ok(())
    }

    /// Deterministic content hash of the config.
    ///
    /// Stored next to persisted rows so derived columns can be traced back to
    /// the settings that produced them. `parallel` does not change the output
    /// and is left out.
    pub fn config_hash(&self) -> Result<String, ConfigError> {
        let canonical = Self {
            parallel: true,
            ..self.clone()
        }
        .to_toml()?;
        Ok(blake3::hash(canonical.as_bytes()).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_standard_columns() {
        let config = PipelineConfig::default();
        assert_eq!(config.indicators.sma_window, 20);
        assert_eq!(config.indicators.ema_window, 20);
        assert_eq!(config.indicators.bollinger_window, 20);
        assert_eq!(config.indicators.bollinger_k, 2.0);
        assert_eq!(config.indicators.rsi_window, 14);
        assert_eq!(config.outlier.threshold, 3.0);
        assert_eq!(config.order_policy, OrderPolicy::Sort);
        assert!(config.parallel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_roundtrip() {
        let config = PipelineConfig::default();
        let toml_str = config.to_toml().unwrap();
        let parsed = PipelineConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed = PipelineConfig::from_toml(
            r#"
            order_policy = "reject"

            [indicators]
            rsi_window = 7

            [outlier]
            basis = "column"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.indicators.rsi_window, 7);
        assert_eq!(parsed.indicators.sma_window, 20);
        assert_eq!(parsed.outlier.basis, ZScoreBasis::Column);
        assert_eq!(parsed.outlier.threshold, 3.0);
        assert_eq!(parsed.order_policy, OrderPolicy::Reject);
    }

    #[test]
    fn zero_window_is_rejected() {
        let err = PipelineConfig::from_toml("[indicators]\nsma_window = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn non_positive_threshold_is_rejected() {
        let mut config = PipelineConfig::default();
        config.outlier.threshold = 0.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.indicators.bollinger_k = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_hash_is_deterministic() {
        let a = PipelineConfig::default();
        let mut b = PipelineConfig::default();
        assert_eq!(a.config_hash().unwrap(), b.config_hash().unwrap());

        b.parallel = false;
        assert_eq!(a.config_hash().unwrap(), b.config_hash().unwrap());

        b.indicators.rsi_window = 10;
        assert_ne!(a.config_hash().unwrap(), b.config_hash().unwrap());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = PipelineConfig::from_file(Path::new("/nonexistent/pipeline.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/pipeline.toml"));
    }
}
