//! Benchtrack - continuous benchmark history and regression detection
//!
//! This library ingests benchmark runs produced in CI, appends them to a
//! durable history document, and judges each benchmark against a baseline
//! drawn from its earlier results.
//!
//! ```
//! use benchtrack::model::{CommitRef, Measurement, Run};
//! use benchtrack::pipeline::IngestionPipeline;
//! use benchtrack::regression::{RegressionConfig, Verdict};
//! use benchtrack::store::HistoryStore;
//! use chrono::{DateTime, TimeZone, Utc};
//!
//! # fn main() -> benchtrack::Result<()> {
//! let config = RegressionConfig::default().with_threshold(1.5);
//! let pipeline = IngestionPipeline::new(HistoryStore::in_memory("Benchmark")?, config)?;
//!
//! let stamp = DateTime::parse_from_rfc3339("2020-12-03T12:02:08+01:00").unwrap();
//! let commit = |id: &str| CommitRef::new(id, stamp);
//! let first = Run::new(commit("a1"), "cargo", Utc.timestamp_millis_opt(1_000).unwrap())
//!     .with_measurement(Measurement::new("fib_15", 100.0, 0.0, "ns/iter"));
//! let second = Run::new(commit("b2"), "cargo", Utc.timestamp_millis_opt(2_000).unwrap())
//!     .with_measurement(Measurement::new("fib_15", 151.0, 0.0, "ns/iter"));
//!
//! pipeline.ingest(first)?;
//! let report = pipeline.ingest(second)?;
//! assert_eq!(report.entries[0].verdict, Verdict::Regressed);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod harness;
pub mod model;
pub mod pipeline;
pub mod regression;
pub mod report;
pub mod store;

pub use error::{HistoryError, Result};
