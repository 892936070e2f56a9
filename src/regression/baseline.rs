// Baseline selection
//
// Only entries strictly before the new entry's position are candidates, so
// a measurement is never compared against itself or against anything
// appended after it.

use crate::model::Entry;
use crate::regression::statistics::aggregate;
use serde::Serialize;

/// How the comparison point is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselinePolicy {
    /// Immediately preceding run
    Previous,
    /// Mean of the last K runs before the new one
    Trailing(usize),
}

impl BaselinePolicy {
    /// Policy for a configured window size (1 means previous run)
    pub fn from_window(window: usize) -> Self {
        if window <= 1 {
            BaselinePolicy::Previous
        } else {
            BaselinePolicy::Trailing(window)
        }
    }

    /// Number of preceding runs the policy looks at
    pub fn window(self) -> usize {
        match self {
            BaselinePolicy::Previous => 1,
            BaselinePolicy::Trailing(k) => k.max(1),
        }
    }
}

/// Comparison point for a new measurement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Baseline {
    /// Value (mean over the window)
    pub value: f64,
    /// Error margin (combined over the window)
    pub error_margin: f64,
    /// Number of runs that contributed
    pub runs: usize,
    /// Most recent commit in the window
    pub commit_id: String,
}

/// Select the baseline for the entry at `position` in `series`
///
/// Returns `None` when nothing precedes the entry: the first observation of
/// a benchmark establishes its baseline and is never judged.
pub fn select_baseline(
    series: &[Entry],
    position: usize,
    policy: BaselinePolicy,
) -> Option<Baseline> {
    let prior = &series[..position.min(series.len())];
    let start = prior.len().saturating_sub(policy.window());
    let window = &prior[start..];
    let latest = window.last()?;

    let points: Vec<(f64, f64)> = window
        .iter()
        .map(|entry| (entry.measurement.value, entry.measurement.error_margin))
        .collect();
    let stats = aggregate(&points)?;

    Some(Baseline {
        value: stats.mean,
        error_margin: stats.combined_margin,
        runs: stats.count,
        commit_id: latest.commit.id.clone(),
    })
}
