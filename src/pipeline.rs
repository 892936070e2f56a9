//! Ingestion pipeline: validate, append, judge, report
//!
//! ```text
//! Run ──► validate ──► HistoryStore::append (durable) ──► per benchmark:
//!                                                          select_baseline
//!                                                          RegressionDetector
//!                                                               │
//!                                          Report ◄─────────────┘
//! ```
//!
//! Ingests are serialized, so the append and the reads used for baseline
//! selection never interleave with another run. Verdicts are computed after
//! the append and are read-only; they cannot undo or fail it.

use crate::config::TrackerConfig;
use crate::error::Result;
use crate::model::Run;
use crate::regression::{select_baseline, BaselinePolicy, RegressionConfig, RegressionDetector};
use crate::report::{Report, ReportEntry};
use crate::store::HistoryStore;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Orchestrates one store and one detector
#[derive(Debug)]
pub struct IngestionPipeline {
    store: HistoryStore,
    detector: RegressionDetector,
    policy: BaselinePolicy,
    ingest_lock: Mutex<()>,
}

impl IngestionPipeline {
    /// Build a pipeline, rejecting an invalid policy up front
    pub fn new(store: HistoryStore, config: RegressionConfig) -> Result<Self> {
        let policy = BaselinePolicy::from_window(config.baseline_window);
        let detector = RegressionDetector::new(config)?;
        Ok(Self {
            store,
            detector,
            policy,
            ingest_lock: Mutex::new(()),
        })
    }

    /// Load the history at `path` and build a pipeline from `config`
    pub fn open(path: impl AsRef<Path>, config: &TrackerConfig) -> Result<Self> {
        config.validate()?;
        let store = HistoryStore::load(path, config.suite.clone())?;
        Self::new(store, config.regression.clone())
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    pub fn detector(&self) -> &RegressionDetector {
        &self.detector
    }

    /// Ingest one run and judge each of its measurements
    ///
    /// Fails with `InvalidRun`, `ToolMismatch` or `StorageFailure` before
    /// anything is recorded. On success the run is already durable.
    pub fn ingest(&self, run: Run) -> Result<Report> {
        let _guard = self.ingest_lock.lock().unwrap_or_else(PoisonError::into_inner);

        run.validate()?;
        tracing::info!(
            "Ingesting {} measurements from '{}' for commit {}",
            run.measurements.len(),
            run.tool_id,
            run.commit.short_id()
        );

        let commit_id = run.commit.id.clone();
        let tool_id = run.tool_id.clone();
        let collected_at = run.collected_at;
        let measurements = run.measurements.clone();

        let receipt = self.store.append(run)?;

        let entries: Vec<ReportEntry> = measurements
            .into_iter()
            .zip(receipt.positions)
            .map(|(measurement, (_, position))| {
                let prior = self
                    .store
                    .trailing(&measurement.name, position, self.policy.window());
                let baseline = select_baseline(&prior, prior.len(), self.policy);
                let direction = self.detector.direction_for(&measurement.name);
                let verdict = self
                    .detector
                    .classify(measurement.value, baseline.as_ref(), direction);

                if verdict.is_regression() {
                    tracing::warn!(
                        "Regression in '{}': {} {} vs baseline {:?}",
                        measurement.name,
                        measurement.value,
                        measurement.unit,
                        baseline.as_ref().map(|b| b.value)
                    );
                } else {
                    tracing::debug!("'{}' is {}", measurement.name, verdict);
                }

                ReportEntry {
                    name: measurement.name,
                    verdict,
                    new_value: measurement.value,
                    baseline_value: baseline.as_ref().map(|b| b.value),
                    baseline_margin: baseline.as_ref().map(|b| b.error_margin),
                    unit: measurement.unit,
                    direction,
                }
            })
            .collect();

        let report = Report {
            suite: self.store.suite().to_string(),
            commit_id,
            tool_id,
            collected_at,
            relative_threshold: self.detector.config().relative_threshold,
            entries,
        };

        tracing::info!(
            "Ingested {} benchmarks, {} regressed",
            report.entries.len(),
            report.regressions().count()
        );
        Ok(report)
    }
}
