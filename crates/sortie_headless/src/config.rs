//! Batch configuration.
//!
//! Loaded from a RON file, then overridden by CLI flags:
//!
//! ```ron
//! (
//!     scenario_dir: "scenarios",
//!     chunk_size: 10,
//!     chunk_delay_ms: 1000,
//!     aggregator_url: "http://127.0.0.1:8009",
//!     thresholds: (max_casualty_rate: 0.5, min_mission_success_rate: 0.75),
//! )
//! ```
//!
//! Missing fields take their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sortie_core::game::DEFAULT_MAX_STEPS;
use sortie_core::playback::DEFAULT_RECORD_EVERY_SECONDS;
use thiserror::Error;

/// Default number of scenarios per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 10;
/// Default pause between chunks.
pub const DEFAULT_CHUNK_DELAY_MS: u64 = 1000;
/// Default aggregator base URL.
pub const DEFAULT_AGGREGATOR_URL: &str = "http://127.0.0.1:8009";

/// Error type for configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found.
    #[error("Config file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// A value is out of range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Business rule turning rates into a binary outcome label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomeThresholds {
    /// Casualty rate must stay strictly below this.
    pub max_casualty_rate: f64,
    /// Mission success rate must be strictly above this.
    pub min_mission_success_rate: f64,
}

impl Default for OutcomeThresholds {
    fn default() -> Self {
        Self {
            max_casualty_rate: 0.5,
            min_mission_success_rate: 0.75,
        }
    }
}

impl OutcomeThresholds {
    /// `1` for a favourable outcome, `0` otherwise.
    #[must_use]
    pub fn label(&self, casualty_rate: f64, mission_success_rate: f64) -> u8 {
        u8::from(
            casualty_rate < self.max_casualty_rate
                && mission_success_rate > self.min_mission_success_rate,
        )
    }
}

/// Configuration for a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Directory holding `*.json` scenario files
    pub scenario_dir: PathBuf,
    /// Scenarios per chunk
    pub chunk_size: usize,
    /// Pause between chunks in milliseconds
    pub chunk_delay_ms: u64,
    /// Aggregator base URL
    pub aggregator_url: String,
    /// Seconds between recorded snapshots
    pub record_every_seconds: i64,
    /// Tick bound per run
    pub max_steps: u64,
    /// Outcome label thresholds
    pub thresholds: OutcomeThresholds,
    /// Append rows to this CSV instead of posting them
    pub csv_output: Option<PathBuf>,
    /// Export full recordings into this directory
    pub recording_dir: Option<PathBuf>,
    /// Write the batch report here
    pub report_path: Option<PathBuf>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario_dir: PathBuf::from("scenarios"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay_ms: DEFAULT_CHUNK_DELAY_MS,
            aggregator_url: DEFAULT_AGGREGATOR_URL.to_string(),
            record_every_seconds: DEFAULT_RECORD_EVERY_SECONDS,
            max_steps: DEFAULT_MAX_STEPS,
            thresholds: OutcomeThresholds::default(),
            csv_output: None,
            recording_dir: None,
            report_path: None,
        }
    }
}

impl BatchConfig {
    /// Load a config from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Parse from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ConfigError> {
        let config: BatchConfig = ron::from_str(ron)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be at least 1".into()));
        }
        if self.record_every_seconds <= 0 {
            return Err(ConfigError::Invalid(
                "record_every_seconds must be positive".into(),
            ));
        }
        if self.max_steps == 0 {
            return Err(ConfigError::Invalid("max_steps must be at least 1".into()));
        }
        Ok(())
    }

    /// Set scenario directory
    pub fn with_scenario_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scenario_dir = dir.into();
        self
    }

    /// Set chunking
    pub fn with_chunking(mut self, chunk_size: usize, chunk_delay_ms: u64) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_delay_ms = chunk_delay_ms;
        self
    }

    /// Set aggregator URL
    pub fn with_aggregator_url(mut self, url: impl Into<String>) -> Self {
        self.aggregator_url = url.into();
        self
    }

    /// Write rows to a local CSV
    pub fn with_csv_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.csv_output = Some(path.into());
        self
    }

    /// Export recordings
    pub fn with_recording_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.recording_dir = Some(dir.into());
        self
    }

    /// Set the tick bound
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Pause between chunks.
    #[must_use]
    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_config_default() {
        let config = BatchConfig::default();
        assert_eq!(config.chunk_size, 10);
        assert_eq!(config.chunk_delay(), Duration::from_millis(1000));
        assert_eq!(config.aggregator_url, "http://127.0.0.1:8009");
        assert_eq!(config.record_every_seconds, 10);
        assert!(config.csv_output.is_none());
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = BatchConfig::from_ron_str(
            r#"(scenario_dir: "data/scenarios", chunk_size: 4, thresholds: (max_casualty_rate: 0.3))"#,
        )
        .unwrap();
        assert_eq!(config.scenario_dir, PathBuf::from("data/scenarios"));
        assert_eq!(config.chunk_size, 4);
        assert_eq!(config.chunk_delay_ms, 1000);
        assert!((config.thresholds.max_casualty_rate - 0.3).abs() < f64::EPSILON);
        assert!((config.thresholds.min_mission_success_rate - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = BatchConfig::from_ron_str("(chunk_size: 0)").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = BatchConfig::load("/definitely/not/here.ron").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.ron");
        std::fs::write(&path, r#"(chunk_delay_ms: 0, csv_output: Some("out.csv"))"#).unwrap();
        let config = BatchConfig::load(&path).unwrap();
        assert_eq!(config.chunk_delay_ms, 0);
        assert_eq!(config.csv_output, Some(PathBuf::from("out.csv")));
    }

    #[test]
    fn test_outcome_label_is_strict() {
        let thresholds = OutcomeThresholds::default();
        assert_eq!(thresholds.label(0.49, 0.76), 1);
        assert_eq!(thresholds.label(0.5, 0.9), 0);
        assert_eq!(thresholds.label(0.1, 0.75), 0);
        assert_eq!(thresholds.label(0.0, 0.0), 0);
    }
}
