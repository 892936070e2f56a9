//! Measurement records: commits, measurements, runs and history entries
//!
//! These types double as the on-disk shape of a run object. The textual
//! `"± <margin>"` convention and the integer rendering of whole values are
//! handled by serde adapters in [`crate::document`]; inside the crate every
//! number is a typed `f64`.

use crate::error::{HistoryError, Result};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Author or committer of a commit (display only)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Person {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Immutable identity of a code revision
///
/// Only `id` and `timestamp` carry meaning for the store; the remaining
/// fields are kept for display and round-tripped untouched, including any
/// field this crate does not know about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Person>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committer: Option<Person>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct: Option<bool>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<FixedOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CommitRef {
    /// Create a commit reference with no display metadata
    pub fn new(id: impl Into<String>, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            author: None,
            committer: None,
            distinct: None,
            id: id.into(),
            message: None,
            timestamp,
            tree_id: None,
            url: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_author(mut self, author: Person) -> Self {
        self.author = Some(author);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Abbreviated id for reports
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(7)
            .map_or(self.id.len(), |(i, _)| i);
        &self.id[..end]
    }
}

/// One named metric from one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    #[serde(with = "crate::document::whole_number")]
    pub value: f64,
    /// One standard deviation (or equivalent spread), stored as `range`
    #[serde(rename = "range", with = "crate::document::range")]
    pub error_margin: f64,
    /// Display/consistency only, never converted
    pub unit: String,
}

impl Measurement {
    pub fn new(
        name: impl Into<String>,
        value: f64,
        error_margin: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            error_margin,
            unit: unit.into(),
        }
    }
}

/// One ingestion event: every measurement a harness produced for one commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub commit: CommitRef,
    #[serde(rename = "date", with = "chrono::serde::ts_milliseconds")]
    pub collected_at: DateTime<Utc>,
    #[serde(rename = "tool")]
    pub tool_id: String,
    #[serde(rename = "benches")]
    pub measurements: Vec<Measurement>,
}

impl Run {
    pub fn new(commit: CommitRef, tool_id: impl Into<String>, collected_at: DateTime<Utc>) -> Self {
        Self {
            commit,
            collected_at,
            tool_id: tool_id.into(),
            measurements: Vec::new(),
        }
    }

    pub fn with_measurement(mut self, measurement: Measurement) -> Self {
        self.measurements.push(measurement);
        self
    }

    /// Check the run is well formed before it touches any history
    ///
    /// Rejects empty runs, blank identifiers, duplicate measurement names
    /// and negative or non-finite values/margins.
    pub fn validate(&self) -> Result<()> {
        if self.commit.id.trim().is_empty() {
            return Err(HistoryError::InvalidRun("commit id is empty".to_string()));
        }
        if self.tool_id.trim().is_empty() {
            return Err(HistoryError::InvalidRun("tool id is empty".to_string()));
        }
        if self.measurements.is_empty() {
            return Err(HistoryError::InvalidRun(format!(
                "run for commit {} has no measurements",
                self.commit.short_id()
            )));
        }

        let mut seen = HashSet::with_capacity(self.measurements.len());
        for m in &self.measurements {
            if m.name.trim().is_empty() {
                return Err(HistoryError::InvalidRun(
                    "measurement with empty name".to_string(),
                ));
            }
            if !seen.insert(m.name.as_str()) {
                return Err(HistoryError::InvalidRun(format!(
                    "duplicate measurement name '{}'",
                    m.name
                )));
            }
            if !m.value.is_finite() || m.value < 0.0 {
                return Err(HistoryError::InvalidRun(format!(
                    "measurement '{}' has invalid value {}",
                    m.name, m.value
                )));
            }
            if !m.error_margin.is_finite() || m.error_margin < 0.0 {
                return Err(HistoryError::InvalidRun(format!(
                    "measurement '{}' has invalid error margin {}",
                    m.name, m.error_margin
                )));
            }
        }

        Ok(())
    }
}

/// One recorded point of a benchmark's history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub commit: CommitRef,
    pub collected_at: DateTime<Utc>,
    pub tool_id: String,
    pub measurement: Measurement,
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_validate_accepts_well_formed_run() {
        let run = run("e4af457a", 1_606_993_507_181, &[("fib_15", 100.0, 3.0)]);
        assert!(run.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_run() {
        let run = run("e4af457a", 1, &[]);
        assert!(matches!(run.validate(), Err(HistoryError::InvalidRun(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let run = run("e4af457a", 1, &[("fib_15", 1.0, 0.0), ("fib_15", 2.0, 0.0)]);
        match run.validate() {
            Err(HistoryError::InvalidRun(msg)) => assert!(msg.contains("fib_15")),
            other => panic!("Expected InvalidRun, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_negative_and_nan() {
        let negative = run("a", 1, &[("x", -1.0, 0.0)]);
        assert!(negative.validate().is_err());

        let nan_margin = run("a", 1, &[("x", 1.0, f64::NAN)]);
        assert!(nan_margin.validate().is_err());

        let inf_value = run("a", 1, &[("x", f64::INFINITY, 0.0)]);
        assert!(inf_value.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_tool() {
        let mut run = run("a", 1, &[("x", 1.0, 0.0)]);
        run.tool_id = "  ".to_string();
        assert!(run.validate().is_err());
    }

    #[test]
    fn test_short_id() {
        assert_eq!(commit("e4af457a3bb7eb0b").short_id(), "e4af457");
        assert_eq!(commit("abc").short_id(), "abc");
    }

    #[test]
    fn test_commit_display_metadata_round_trips() {
        let original = commit("e4af457a");
        let json = serde_json::to_value(&original).unwrap();
        assert_eq!(json["message"], "Tweak interpreter loop");
        assert_eq!(json["author"]["username"], "dev");
        assert_eq!(json["url"], "https://github.com/rune-rs/rune/commit/e4af457a");
        assert!(json.get("committer").is_none());

        let back: CommitRef = serde_json::from_value(json).unwrap();
        assert_eq!(back, original);
    }
}
