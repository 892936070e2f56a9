// Regression verdicts from a new measurement and its baseline
//
// Lower-is-better:
//   effective = baseline + (error_margin_aware ? margin : 0)
//   Regressed  when new > effective * threshold
//   Improved   when new < baseline / threshold
// Higher-is-better mirrors it:
//   effective = max(baseline - (aware ? margin : 0), 0)
//   Regressed  when new < effective / threshold
//   Improved   when new > baseline * threshold

use crate::error::Result;
use crate::regression::baseline::Baseline;
use crate::regression::config::{Direction, RegressionConfig};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a new measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// No baseline to compare against (first observation)
    Insufficient,
    /// Within the threshold band
    Stable,
    /// Better than baseline by more than the threshold
    Improved,
    /// Worse than baseline by more than the threshold
    Regressed,
}

impl Verdict {
    pub fn is_regression(self) -> bool {
        self == Verdict::Regressed
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Verdict::Insufficient => "⚪",
            Verdict::Stable => "✅",
            Verdict::Improved => "🚀",
            Verdict::Regressed => "❌",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Verdict::Insufficient => "insufficient",
            Verdict::Stable => "stable",
            Verdict::Improved => "improved",
            Verdict::Regressed => "regressed",
        };
        f.write_str(label)
    }
}

/// Threshold comparator holding a validated configuration
///
/// Construction is the only fallible step; classification never fails.
///
/// # Example
/// ```
/// use benchtrack::regression::{
///     Baseline, Direction, RegressionConfig, RegressionDetector, Verdict,
/// };
///
/// let detector = RegressionDetector::new(
///     RegressionConfig::default().with_threshold(1.5).with_error_margin_aware(false),
/// ).unwrap();
/// let baseline = Baseline {
///     value: 100.0,
///     error_margin: 0.0,
///     runs: 1,
///     commit_id: "abc".into(),
/// };
/// let judge = |value| detector.classify(value, Some(&baseline), Direction::LowerIsBetter);
///
/// assert_eq!(judge(151.0), Verdict::Regressed);
/// assert_eq!(judge(149.0), Verdict::Stable);
/// assert_eq!(judge(60.0), Verdict::Improved);
/// ```
#[derive(Debug, Clone)]
pub struct RegressionDetector {
    config: RegressionConfig,
}

impl RegressionDetector {
    /// Validate `config` and build a detector from it
    pub fn new(config: RegressionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RegressionConfig {
        &self.config
    }

    /// Direction configured for a benchmark name
    pub fn direction_for(&self, name: &str) -> Direction {
        self.config.direction_for(name)
    }

    /// Classify `new_value` against `baseline`
    pub fn classify(
        &self,
        new_value: f64,
        baseline: Option<&Baseline>,
        direction: Direction,
    ) -> Verdict {
        let Some(baseline) = baseline else {
            return Verdict::Insufficient;
        };

        let threshold = self.config.relative_threshold;
        let margin = if self.config.error_margin_aware {
            baseline.error_margin
        } else {
            0.0
        };

        match direction {
            Direction::LowerIsBetter => {
                let effective = baseline.value + margin;
                if new_value > effective * threshold {
                    Verdict::Regressed
                } else if new_value < baseline.value / threshold {
                    Verdict::Improved
                } else {
                    Verdict::Stable
                }
            }
            Direction::HigherIsBetter => {
                let effective = (baseline.value - margin).max(0.0);
                if new_value < effective / threshold {
                    Verdict::Regressed
                } else if new_value > baseline.value * threshold {
                    Verdict::Improved
                } else {
                    Verdict::Stable
                }
            }
        }
    }
}
