//! Library-level tests: pipeline over a file-backed history
//!
//! Covers durability across reopen, partition isolation and baseline
//! selection against persisted data.

use benchtrack::config::TrackerConfig;
use benchtrack::model::{CommitRef, Measurement, Run};
use benchtrack::pipeline::IngestionPipeline;
use benchtrack::regression::{RegressionConfig, Verdict};
use benchtrack::store::HistoryStore;
use benchtrack::HistoryError;
use chrono::{DateTime, TimeZone, Utc};
use std::fs;
use tempfile::TempDir;

fn run(commit: &str, ms: i64, tool: &str, benches: &[(&str, f64)]) -> Run {
    let timestamp = DateTime::parse_from_rfc3339("2020-12-03T12:02:08+01:00").unwrap();
    let mut run = Run::new(
        CommitRef::new(commit, timestamp),
        tool,
        Utc.timestamp_millis_opt(ms).unwrap(),
    );
    for (name, value) in benches {
        run = run.with_measurement(Measurement::new(*name, *value, 0.0, "ns/iter"));
    }
    run
}

#[test]
fn test_history_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("data.json");
    let config = TrackerConfig::default();

    {
        let pipeline = IngestionPipeline::open(&path, &config).unwrap();
        pipeline
            .ingest(run("c1", 1_000, "cargo", &[("fib_15", 100.0), ("fib_20", 900.0)]))
            .unwrap();
    }

    let pipeline = IngestionPipeline::open(&path, &config).unwrap();
    assert_eq!(pipeline.store().benchmark_names(), vec!["fib_15", "fib_20"]);

    let report = pipeline
        .ingest(run("c2", 2_000, "cargo", &[("fib_15", 400.0)]))
        .unwrap();
    assert_eq!(report.entries[0].verdict, Verdict::Regressed);
    assert_eq!(report.entries[0].baseline_value, Some(100.0));
}

#[test]
fn test_tool_mismatch_leaves_file_untouched() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("data.json");
    let pipeline = IngestionPipeline::open(&path, &TrackerConfig::default()).unwrap();

    pipeline
        .ingest(run("c1", 1_000, "cargo", &[("fib_15", 100.0)]))
        .unwrap();
    let before = fs::read_to_string(&path).unwrap();

    let result = pipeline.ingest(run("c2", 2_000, "criterion", &[("fib_15", 100.0), ("new", 1.0)]));
    assert!(matches!(result, Err(HistoryError::ToolMismatch { .. })));

    assert_eq!(fs::read_to_string(&path).unwrap(), before);
    assert!(pipeline.store().series("new").is_empty());
}

#[test]
fn test_suites_are_isolated() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("data.js");

    let mut runtime = TrackerConfig::default();
    runtime.suite = "Runtime".to_string();
    IngestionPipeline::open(&path, &runtime)
        .unwrap()
        .ingest(run("c1", 1_000, "cargo", &[("fib_15", 100.0)]))
        .unwrap();

    let compile = IngestionPipeline::open(&path, &TrackerConfig::default()).unwrap();
    assert!(compile.store().series("fib_15").is_empty());
    compile
        .ingest(run("c1", 1_000, "cargo", &[("parse", 5.0)]))
        .unwrap();

    let reopened = HistoryStore::load(&path, "Runtime").unwrap();
    assert_eq!(reopened.series("fib_15").len(), 1);
    assert!(fs::read_to_string(&path)
        .unwrap()
        .starts_with("window.BENCHMARK_DATA = "));
}

#[test]
fn test_window_smooths_spike_from_persisted_history() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("data.json");
    let mut config = TrackerConfig::default();
    config.regression = RegressionConfig::default()
        .with_threshold(1.5)
        .with_window(4)
        .with_error_margin_aware(false);

    let pipeline = IngestionPipeline::open(&path, &config).unwrap();
    for (i, value) in [100.0, 100.0, 100.0, 400.0].iter().enumerate() {
        pipeline
            .ingest(run(&format!("c{}", i), i as i64 * 1_000, "cargo", &[("bench", *value)]))
            .unwrap();
    }

    let report = pipeline
        .ingest(run("c9", 9_000, "cargo", &[("bench", 180.0)]))
        .unwrap();
    assert_eq!(report.entries[0].baseline_value, Some(175.0));
    assert_eq!(report.entries[0].verdict, Verdict::Stable);
}
