// Configuration for threshold-based regression detection
//
// Thresholds are multiplicative so one policy covers benchmarks from
// nanoseconds to hundreds of milliseconds.

use crate::error::{HistoryError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which way a benchmark gets better
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Time per iteration and similar costs (default)
    #[default]
    LowerIsBetter,
    /// Throughput, operations per second
    HigherIsBetter,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::LowerIsBetter => write!(f, "lower-is-better"),
            Direction::HigherIsBetter => write!(f, "higher-is-better"),
        }
    }
}

/// Configuration for regression detection
///
/// # Example
/// ```
/// use benchtrack::regression::RegressionConfig;
///
/// let config = RegressionConfig::default();
/// assert_eq!(config.relative_threshold, 2.0); // flag at 200% of baseline
/// assert_eq!(config.baseline_window, 1); // previous run only
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegressionConfig {
    /// Multiplicative alert factor, strictly greater than 1.0
    ///
    /// - 2.0 (default): new value must be twice the baseline to regress
    /// - 1.5: flag at 150% of baseline
    ///
    /// Accepts a float or a percentage string (`"150%"`) in config files.
    #[serde(deserialize_with = "deserialize_threshold")]
    pub relative_threshold: f64,

    /// Widen the acceptance band by the baseline's error margin
    ///
    /// Short benchmarks jitter by a large fraction of their mean between
    /// runs; folding the margin in keeps that jitter from reading as a
    /// regression.
    ///
    /// Default: true
    pub error_margin_aware: bool,

    /// Number of preceding runs aggregated into the baseline (K)
    ///
    /// Default: 1 (immediately preceding run)
    pub baseline_window: usize,

    /// Direction for benchmarks with no explicit entry in `directions`
    pub default_direction: Direction,

    /// Per-benchmark direction overrides, keyed by benchmark name
    #[serde(rename = "benchmarks")]
    pub directions: BTreeMap<String, Direction>,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            relative_threshold: 2.0,
            error_margin_aware: true,
            baseline_window: 1,
            default_direction: Direction::LowerIsBetter,
            directions: BTreeMap::new(),
        }
    }
}

impl RegressionConfig {
    /// Create a strict configuration (flags smaller slowdowns, smoother baseline)
    pub fn strict() -> Self {
        Self {
            relative_threshold: 1.2,
            baseline_window: 5,
            ..Self::default()
        }
    }

    /// Create a permissive configuration (only flags gross slowdowns)
    pub fn permissive() -> Self {
        Self {
            relative_threshold: 3.0,
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, relative_threshold: f64) -> Self {
        self.relative_threshold = relative_threshold;
        self
    }

    pub fn with_window(mut self, baseline_window: usize) -> Self {
        self.baseline_window = baseline_window;
        self
    }

    pub fn with_error_margin_aware(mut self, aware: bool) -> Self {
        self.error_margin_aware = aware;
        self
    }

    pub fn with_direction(mut self, name: impl Into<String>, direction: Direction) -> Self {
        self.directions.insert(name.into(), direction);
        self
    }

    /// Direction configured for `name`, falling back to the default
    pub fn direction_for(&self, name: &str) -> Direction {
        self.directions
            .get(name)
            .copied()
            .unwrap_or(self.default_direction)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.relative_threshold.is_finite() || self.relative_threshold <= 1.0 {
            return Err(HistoryError::ConfigError(format!(
                "relative_threshold must be a finite factor > 1.0, got {}",
                self.relative_threshold
            )));
        }

        if self.baseline_window == 0 {
            return Err(HistoryError::ConfigError("baseline_window must be >= 1".to_string()));
        }

        if let Some(name) = self.directions.keys().find(|name| name.trim().is_empty()) {
            return Err(HistoryError::ConfigError(format!(
                "direction override for empty benchmark name '{}'",
                name
            )));
        }

        Ok(())
    }
}

/// Parse a threshold written as a factor (`"1.5"`) or percentage (`"150%"`)
pub fn parse_threshold(text: &str) -> std::result::Result<f64, String> {
    let text = text.trim();
    let (number, scale) = match text.strip_suffix('%') {
        Some(pct) => (pct.trim(), 100.0),
        None => (text, 1.0),
    };
    number
        .parse::<f64>()
        .map(|value| value / scale)
        .map_err(|_| format!("invalid threshold '{}', expected e.g. 1.5 or 150%", text))
}

pub(crate) fn deserialize_threshold<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Factor(f64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Factor(value) => Ok(value),
        Repr::Text(text) => parse_threshold(&text).map_err(serde::de::Error::custom),
    }
}
