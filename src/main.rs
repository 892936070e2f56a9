use anyhow::{Context, Result};
use benchtrack::cli::{Cli, Command, IngestArgs, OutputFormat, SeriesArgs};
use benchtrack::config::TrackerConfig;
use benchtrack::document::format_range;
use benchtrack::harness;
use benchtrack::model::{CommitRef, Run};
use benchtrack::pipeline::IngestionPipeline;
use benchtrack::store::HistoryStore;
use chrono::Utc;
use clap::Parser;
use std::fs;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` turns on everything
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Read the run to ingest from --run or --bench-output
fn load_run(args: &IngestArgs) -> Result<Run> {
    match (&args.run, &args.bench_output) {
        (Some(path), None) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read run file {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse run file {}", path.display()))
        }
        (None, Some(path)) => {
            let output = fs::read_to_string(path)
                .with_context(|| format!("Failed to read bench output {}", path.display()))?;
            let commit_id = args
                .commit
                .as_deref()
                .context("--bench-output requires --commit")?;
            let now = Utc::now();
            let commit = CommitRef::new(commit_id, now.into());
            Ok(harness::run_from_libtest_output(commit, &args.tool, now, &output))
        }
        _ => anyhow::bail!("Must specify either --run FILE or --bench-output FILE --commit SHA"),
    }
}

/// Returns whether any benchmark regressed
fn run_ingest(args: &IngestArgs) -> Result<bool> {
    let config = args.resolve_config()?;
    let run = load_run(args)?;
    let pipeline = IngestionPipeline::open(&args.store.store, &config)
        .with_context(|| format!("Failed to open history {}", args.store.store.display()))?;

    let report = pipeline.ingest(run)?;

    match args.format {
        OutputFormat::Text => print!("{}", report.to_report_string()),
        OutputFormat::Markdown => print!("{}", report.to_markdown()),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    Ok(report.has_regressions())
}

fn run_series(args: &SeriesArgs) -> Result<()> {
    let config = args.store.load_config()?;
    let store = HistoryStore::load(&args.store.store, config.suite)
        .with_context(|| format!("Failed to open history {}", args.store.store.display()))?;
    let series = store.series(&args.name);

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&series)?),
        OutputFormat::Markdown => {
            println!("| Commit | Date | Value | Range |");
            println!("|-|-|-|-|");
            for entry in &series {
                println!(
                    "| {} | {} | {} {} | {} |",
                    entry.commit.short_id(),
                    entry.collected_at.to_rfc3339(),
                    entry.measurement.value,
                    entry.measurement.unit,
                    format_range(entry.measurement.error_margin)
                );
            }
        }
        OutputFormat::Text => {
            if series.is_empty() {
                println!("No history for '{}'", args.name);
            }
            for entry in &series {
                println!(
                    "{}  {}  {} {} {}",
                    entry.commit.short_id(),
                    entry.collected_at.to_rfc3339(),
                    entry.measurement.value,
                    format_range(entry.measurement.error_margin),
                    entry.measurement.unit
                );
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    match &args.command {
        Command::Ingest(ingest) => {
            let regressed = run_ingest(ingest)?;
            if regressed && ingest.fail_on_regression {
                std::process::exit(1);
            }
        }
        Command::Series(series) => run_series(series)?,
        Command::CheckConfig { path } => {
            let config = TrackerConfig::from_file(path)?;
            println!("✅ {} is valid", path.display());
            println!("  suite: {}", config.suite);
            println!(
                "  relative_threshold: {:.0}%",
                config.regression.relative_threshold * 100.0
            );
            println!("  error_margin_aware: {}", config.regression.error_margin_aware);
            println!("  baseline_window: {}", config.regression.baseline_window);
            println!("  default_direction: {}", config.regression.default_direction);
        }
    }

    Ok(())
}
