// Baseline selection and threshold-based regression detection
//
// A new measurement is compared against the run(s) preceding it in the same
// series:
// - Baseline: previous run, or the mean of a trailing window of K runs
// - Threshold: multiplicative factor, scale-invariant across benchmarks
// - Noise: the baseline's error margin widens the acceptance band
//
// First observations have no baseline and are never judged.

mod baseline;
mod config;
mod statistics;
mod verdict;

pub use baseline::{select_baseline, Baseline, BaselinePolicy};
pub use config::{parse_threshold, Direction, RegressionConfig};
pub use statistics::{aggregate, mean, population_variance, WindowStats};
pub use verdict::{RegressionDetector, Verdict};

pub(crate) use config::deserialize_threshold;
