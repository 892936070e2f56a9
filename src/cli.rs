//! CLI argument parsing for Benchtrack

use crate::config::TrackerConfig;
use crate::error::Result;
use crate::regression::parse_threshold;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for reports and series
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// Markdown table for pull request comments
    Markdown,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "benchtrack")]
#[command(version)]
#[command(about = "Benchmark history tracking and regression detection for CI", long_about = None)]
pub struct Cli {
    /// Enable debug tracing output to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Append a run to the history and report a verdict per benchmark
    Ingest(IngestArgs),
    /// Print the stored series of one benchmark
    Series(SeriesArgs),
    /// Validate a benchtrack.toml file
    CheckConfig {
        /// Path to the configuration file
        path: PathBuf,
    },
}

/// Options shared by every command that opens the history
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// History document (.json, or .js for the `window.BENCHMARK_DATA` form)
    #[arg(long = "store", value_name = "FILE")]
    pub store: PathBuf,

    /// Configuration file (benchtrack.toml)
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Suite (partition) of the history to use
    #[arg(long = "suite", value_name = "NAME")]
    pub suite: Option<String>,
}

impl StoreArgs {
    /// Configuration file contents with the `--suite` override applied
    pub fn load_config(&self) -> Result<TrackerConfig> {
        let mut config = match &self.config {
            Some(path) => TrackerConfig::from_file(path)?,
            None => TrackerConfig::default(),
        };
        if let Some(suite) = &self.suite {
            config.suite = suite.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Run to ingest, as JSON (`{commit, date, tool, benches}`)
    #[arg(long = "run", value_name = "FILE", conflicts_with = "bench_output")]
    pub run: Option<PathBuf>,

    /// `cargo bench` output to ingest (libtest format)
    #[arg(long = "bench-output", value_name = "FILE", requires = "commit")]
    pub bench_output: Option<PathBuf>,

    /// Commit id for --bench-output
    #[arg(long = "commit", value_name = "SHA")]
    pub commit: Option<String>,

    /// Tool id for --bench-output
    #[arg(long = "tool", value_name = "TOOL", default_value = "cargo")]
    pub tool: String,

    /// Alert threshold as a factor or percentage (e.g. 1.5 or 150%)
    #[arg(long = "threshold", value_name = "RATIO", value_parser = parse_threshold)]
    pub threshold: Option<f64>,

    /// Number of previous runs averaged into the baseline
    #[arg(long = "window", value_name = "K")]
    pub window: Option<usize>,

    /// Widen the threshold by the baseline's error margin (true/false)
    #[arg(long = "error-margin-aware", value_name = "BOOL")]
    pub error_margin_aware: Option<bool>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Exit with status 1 when any benchmark regressed
    #[arg(long = "fail-on-regression")]
    pub fail_on_regression: bool,
}

impl IngestArgs {
    /// Configuration with every command-line override applied
    pub fn resolve_config(&self) -> Result<TrackerConfig> {
        let mut config = self.store.load_config()?;
        if let Some(threshold) = self.threshold {
            config.regression.relative_threshold = threshold;
        }
        if let Some(window) = self.window {
            config.regression.baseline_window = window;
        }
        if let Some(aware) = self.error_margin_aware {
            config.regression.error_margin_aware = aware;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct SeriesArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Benchmark name
    pub name: String,

    /// Output format (markdown prints a table)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,
}
