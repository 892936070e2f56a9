//! Verdict reports for the CI collaborator
//!
//! One [`ReportEntry`] per benchmark in the ingested run, in run order.
//! Rendered as plain text for logs, as a Markdown table for PR comments, or
//! as JSON for machines.

use crate::document::format_range;
use crate::regression::{Direction, Verdict};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Verdict for one benchmark of an ingested run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub name: String,
    pub verdict: Verdict,
    pub new_value: f64,
    /// `None` when the benchmark had no history
    pub baseline_value: Option<f64>,
    pub baseline_margin: Option<f64>,
    pub unit: String,
    pub direction: Direction,
}

impl ReportEntry {
    /// `new / baseline`, `None` without a usable baseline
    pub fn ratio(&self) -> Option<f64> {
        match self.baseline_value {
            Some(base) if base > 0.0 => Some(self.new_value / base),
            _ => None,
        }
    }
}

/// Outcome of ingesting one run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub suite: String,
    pub commit_id: String,
    pub tool_id: String,
    pub collected_at: DateTime<Utc>,
    pub relative_threshold: f64,
    pub entries: Vec<ReportEntry>,
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value)
    } else {
        format!("{:.3}", value)
    }
}

fn format_ratio(ratio: Option<f64>) -> String {
    ratio.map_or_else(|| "-".to_string(), |r| format!("{:.2}", r))
}

impl Report {
    /// Entries whose verdict is `Regressed`
    pub fn regressions(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| e.verdict.is_regression())
    }

    pub fn has_regressions(&self) -> bool {
        self.regressions().next().is_some()
    }

    /// Number of entries with `verdict`
    pub fn count(&self, verdict: Verdict) -> usize {
        self.entries.iter().filter(|e| e.verdict == verdict).count()
    }

    fn short_commit(&self) -> &str {
        let end = self
            .commit_id
            .char_indices()
            .nth(7)
            .map_or(self.commit_id.len(), |(i, _)| i);
        &self.commit_id[..end]
    }

    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();
        let regressed = self.count(Verdict::Regressed);

        if regressed > 0 {
            report.push_str(&format!(
                "❌ REGRESSION DETECTED ({} of {} benchmarks)\n\n",
                regressed,
                self.entries.len()
            ));
        } else {
            report.push_str(&format!(
                "✅ NO REGRESSION DETECTED ({} benchmarks)\n\n",
                self.entries.len()
            ));
        }

        report.push_str(&format!(
            "Suite: {}  Commit: {}  Tool: {}\n",
            self.suite,
            self.short_commit(),
            self.tool_id
        ));
        report.push_str(&format!(
            "Threshold: {:.0}% of baseline\n",
            self.relative_threshold * 100.0
        ));
        report.push_str(&format!(
            "Improved: {}  Stable: {}  New: {}\n",
            self.count(Verdict::Improved),
            self.count(Verdict::Stable),
            self.count(Verdict::Insufficient)
        ));

        if !self.entries.is_empty() {
            report.push_str("\n📊 Benchmarks:\n");
            for entry in &self.entries {
                let baseline = match (entry.baseline_value, entry.baseline_margin) {
                    (Some(value), Some(margin)) => {
                        format!("baseline {} {}", format_value(value), format_range(margin))
                    }
                    (Some(value), None) => format!("baseline {}", format_value(value)),
                    _ => "no baseline".to_string(),
                };
                report.push_str(&format!(
                    "  {} {} {} {} ({}, ratio {}) {}\n",
                    entry.verdict.symbol(),
                    entry.name,
                    format_value(entry.new_value),
                    entry.unit,
                    baseline,
                    format_ratio(entry.ratio()),
                    entry.verdict
                ));
            }
        }

        report
    }

    /// Markdown table suitable for a pull request comment
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        if self.has_regressions() {
            output.push_str("# ⚠️ Performance Alert ⚠️\n\n");
            output.push_str(&format!(
                "Possible performance regression detected for commit {}.\n",
                self.commit_id
            ));
            output.push_str(&format!(
                "Benchmark results of this commit are worse than the previous results exceeding threshold `{:.0}%`.\n\n",
                self.relative_threshold * 100.0
            ));
        } else {
            output.push_str(&format!("# {} Benchmark Result\n\n", self.suite));
        }

        output.push_str("| Benchmark | Baseline | Current | Ratio | Verdict |\n");
        output.push_str("|-|-|-|-|-|\n");

        for entry in &self.entries {
            let baseline = entry.baseline_value.map_or_else(
                || "-".to_string(),
                |value| format!("{} {}", format_value(value), entry.unit),
            );
            output.push_str(&format!(
                "| `{}` | {} | {} {} | {} | {} {} |\n",
                entry.name,
                baseline,
                format_value(entry.new_value),
                entry.unit,
                format_ratio(entry.ratio()),
                entry.verdict.symbol(),
                entry.verdict
            ));
        }

        output
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
