//! Pipeline configuration file (benchtrack.toml)
//!
//! # Example benchtrack.toml
//!
//! ```toml
//! # History partition this pipeline writes to
//! suite = "Benchmark"
//!
//! # Flag when a benchmark gets 50% slower than its baseline
//! relative_threshold = "150%"
//! error_margin_aware = true
//! baseline_window = 3
//! default_direction = "lower-is-better"
//!
//! [benchmarks]
//! "primes/rune" = "higher-is-better"
//! ```

use crate::document::DEFAULT_SUITE;
use crate::error::{HistoryError, Result};
use crate::regression::{deserialize_threshold, Direction, RegressionConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Root configuration for benchtrack.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TrackerConfigFile")]
pub struct TrackerConfig {
    /// Grouping key in the history document
    pub suite: String,

    /// Threshold, window and direction policy
    #[serde(flatten)]
    pub regression: RegressionConfig,
}

/// On-disk layout of benchtrack.toml; misspelled keys are errors
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TrackerConfigFile {
    suite: String,
    #[serde(deserialize_with = "deserialize_threshold")]
    relative_threshold: f64,
    error_margin_aware: bool,
    baseline_window: usize,
    default_direction: Direction,
    benchmarks: BTreeMap<String, Direction>,
}

impl Default for TrackerConfigFile {
    fn default() -> Self {
        TrackerConfig::default().into()
    }
}

impl From<TrackerConfig> for TrackerConfigFile {
    fn from(config: TrackerConfig) -> Self {
        let regression = config.regression;
        Self {
            suite: config.suite,
            relative_threshold: regression.relative_threshold,
            error_margin_aware: regression.error_margin_aware,
            baseline_window: regression.baseline_window,
            default_direction: regression.default_direction,
            benchmarks: regression.directions,
        }
    }
}

impl From<TrackerConfigFile> for TrackerConfig {
    fn from(file: TrackerConfigFile) -> Self {
        Self {
            suite: file.suite,
            regression: RegressionConfig {
                relative_threshold: file.relative_threshold,
                error_margin_aware: file.error_margin_aware,
                baseline_window: file.baseline_window,
                default_direction: file.default_direction,
                directions: file.benchmarks,
            },
        }
    }
}

fn default_suite() -> String {
    DEFAULT_SUITE.to_string()
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            suite: default_suite(),
            regression: RegressionConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Load and validate configuration from a TOML file
    ///
    /// # Example
    ///
    /// ```no_run
    /// use benchtrack::config::TrackerConfig;
    ///
    /// # fn main() -> benchtrack::Result<()> {
    /// let config = TrackerConfig::from_file("benchtrack.toml")?;
    /// println!("Alerting at {}x", config.regression.relative_threshold);
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            HistoryError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_toml_str(&content)
    }

    /// Load and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TrackerConfig = toml::from_str(content)
            .map_err(|e| HistoryError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.suite.trim().is_empty() {
            return Err(HistoryError::ConfigError(
                "suite must not be empty".to_string(),
            ));
        }
        self.regression.validate()
    }
}
