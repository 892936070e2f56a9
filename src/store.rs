//! Append-only benchmark history store
//!
//! One store instance owns one partition (suite) of a history document and
//! the document's `lastUpdate` stamp. Other partitions are carried along
//! untouched.
//!
//! # Concurrency
//!
//! ```text
//!   append ──► writer mutex ──► clone snapshot ──► validate + stage
//!                                                      │
//!                                  save staged document (tmp + rename)
//!                                                      │
//!   series ──► read lock ◄──────────── swap snapshot (write lock)
//! ```
//!
//! Writers are serialized by a mutex. Readers only hold the read lock long
//! enough to clone an `Arc` of the current snapshot, so they never wait on
//! disk I/O. A failed validation or save leaves both memory and disk as they
//! were.
//!
//! # Example
//!
//! ```
//! use benchtrack::model::{CommitRef, Measurement, Run};
//! use benchtrack::store::HistoryStore;
//! use chrono::{DateTime, Utc};
//!
//! # fn main() -> benchtrack::Result<()> {
//! let store = HistoryStore::in_memory("Benchmark")?;
//! let commit = CommitRef::new(
//!     "e4af457a3bb7eb0b088724703ceb56042019dec2",
//!     DateTime::parse_from_rfc3339("2020-12-03T12:02:08+01:00").unwrap(),
//! );
//! let run = Run::new(commit, "cargo", Utc::now())
//!     .with_measurement(Measurement::new("fib_15", 5_000.0, 120.0, "ns/iter"));
//!
//! let receipt = store.append(run)?;
//! assert_eq!(receipt.appended, 1);
//! assert_eq!(store.series("fib_15").len(), 1);
//! assert!(store.series("unknown").is_empty());
//! # Ok(())
//! # }
//! ```

use crate::document::{self, Document, DocumentFormat, DEFAULT_SUITE};
use crate::error::{HistoryError, Result};
use crate::model::{Entry, Run};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tempfile::NamedTempFile;

/// Where each appended benchmark landed in its series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendReceipt {
    /// Number of entries appended (one per measurement)
    pub appended: usize,
    /// `(name, index in series)` in run order
    pub positions: Vec<(String, usize)>,
}

impl AppendReceipt {
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.positions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, pos)| *pos)
    }
}

/// Per-name index into the run list
#[derive(Debug, Clone)]
struct SeriesIndex {
    tool_id: String,
    unit: String,
    /// (run index, measurement index), oldest first
    slots: Vec<(usize, usize)>,
}

/// Immutable snapshot of one partition
///
/// Cloning shares the runs and the foreign partitions; only the index is
/// copied.
#[derive(Debug, Clone, Default)]
struct HistoryState {
    document: Document,
    runs: Vec<Arc<Run>>,
    index: HashMap<String, SeriesIndex>,
}

impl HistoryState {
    /// Reject `run` if it breaks an invariant of the existing history
    fn check(&self, run: &Run) -> Result<()> {
        run.validate()?;

        for m in &run.measurements {
            let Some(series) = self.index.get(&m.name) else {
                continue;
            };

            if series.tool_id != run.tool_id {
                return Err(HistoryError::ToolMismatch {
                    name: m.name.clone(),
                    expected: series.tool_id.clone(),
                    found: run.tool_id.clone(),
                });
            }

            if series.unit != m.unit {
                return Err(HistoryError::InvalidRun(format!(
                    "benchmark '{}' is recorded in '{}', run reports '{}'",
                    m.name, series.unit, m.unit
                )));
            }

            if let Some(&(run_idx, _)) = series.slots.last() {
                let latest = self.runs[run_idx].collected_at;
                if run.collected_at < latest {
                    return Err(HistoryError::InvalidRun(format!(
                        "run collected at {} predates latest '{}' entry ({})",
                        run.collected_at.to_rfc3339(),
                        m.name,
                        latest.to_rfc3339()
                    )));
                }
            }
        }

        Ok(())
    }

    /// Append a checked run, returning each measurement's series position
    fn apply(&mut self, run: Run) -> Vec<(String, usize)> {
        let run_idx = self.runs.len();
        let mut positions = Vec::with_capacity(run.measurements.len());

        for (bench_idx, m) in run.measurements.iter().enumerate() {
            let series = self
                .index
                .entry(m.name.clone())
                .or_insert_with(|| SeriesIndex {
                    tool_id: run.tool_id.clone(),
                    unit: m.unit.clone(),
                    slots: Vec::new(),
                });
            positions.push((m.name.clone(), series.slots.len()));
            series.slots.push((run_idx, bench_idx));
        }

        self.runs.push(Arc::new(run));
        positions
    }

    fn entry(&self, (run_idx, bench_idx): (usize, usize)) -> Entry {
        let run = &self.runs[run_idx];
        Entry {
            commit: run.commit.clone(),
            collected_at: run.collected_at,
            tool_id: run.tool_id.clone(),
            measurement: run.measurements[bench_idx].clone(),
        }
    }

    fn series(&self, name: &str) -> Vec<Entry> {
        self.index
            .get(name)
            .map(|series| series.slots.iter().map(|&slot| self.entry(slot)).collect())
            .unwrap_or_default()
    }

    /// Up to `count` entries of `name` immediately before `position`
    fn trailing(&self, name: &str, position: usize, count: usize) -> Vec<Entry> {
        let Some(series) = self.index.get(name) else {
            return Vec::new();
        };
        let end = position.min(series.slots.len());
        let start = end.saturating_sub(count);
        series.slots[start..end]
            .iter()
            .map(|&slot| self.entry(slot))
            .collect()
    }

    fn entry_count(&self) -> usize {
        self.index.values().map(|s| s.slots.len()).sum()
    }
}

fn checked_suite(suite: String) -> Result<String> {
    if suite.trim().is_empty() {
        return Err(HistoryError::ConfigError(format!(
            "suite must not be empty (e.g. \"{}\")",
            DEFAULT_SUITE
        )));
    }
    Ok(suite)
}

/// Durable, append-only history of one benchmark suite
#[derive(Debug)]
pub struct HistoryStore {
    suite: String,
    path: Option<PathBuf>,
    format: DocumentFormat,
    state: RwLock<Arc<HistoryState>>,
    writer: Mutex<()>,
}

impl HistoryStore {
    /// Create a store with no backing file
    pub fn in_memory(suite: impl Into<String>) -> Result<Self> {
        let suite = checked_suite(suite.into())?;
        Ok(Self::with_state(
            suite,
            None,
            DocumentFormat::Json,
            HistoryState::default(),
        ))
    }

    /// Load the store backed by `path`, working on partition `suite`
    ///
    /// A missing file yields an empty store that will be created on the
    /// first append. Every stored run is replayed through the same checks as
    /// a fresh append; a document that violates them is reported as an
    /// `InvalidData` storage failure. A blank suite is a `ConfigError`.
    pub fn load(path: impl AsRef<Path>, suite: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let suite = checked_suite(suite.into())?;

        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No history at {}, starting empty", path.display());
                return Ok(Self::with_state(
                    suite,
                    Some(path.to_path_buf()),
                    DocumentFormat::for_path(path),
                    HistoryState::default(),
                ));
            }
            Err(e) => return Err(HistoryError::storage(path, e)),
        };

        let (document, format) =
            document::parse_document(&text).map_err(|e| HistoryError::corrupt(path, e))?;

        let runs = match document.entries.get(&suite) {
            Some(value) => {
                document::parse_runs(value).map_err(|e| HistoryError::corrupt(path, e))?
            }
            None => Vec::new(),
        };

        let mut state = HistoryState {
            document,
            ..HistoryState::default()
        };
        for run in runs {
            state
                .check(&run)
                .map_err(|e| HistoryError::corrupt(path, format!("stored run rejected: {}", e)))?;
            state.apply(run);
        }

        tracing::info!(
            "Loaded {} runs ({} benchmarks) for suite '{}' from {}",
            state.runs.len(),
            state.index.len(),
            suite,
            path.display()
        );

        Ok(Self::with_state(suite, Some(path.to_path_buf()), format, state))
    }

    fn with_state(
        suite: String,
        path: Option<PathBuf>,
        format: DocumentFormat,
        state: HistoryState,
    ) -> Self {
        Self {
            suite,
            path,
            format,
            state: RwLock::new(Arc::new(state)),
            writer: Mutex::new(()),
        }
    }

    pub fn suite(&self) -> &str {
        &self.suite
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    fn snapshot(&self) -> Arc<HistoryState> {
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn publish(&self, state: HistoryState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(state);
    }

    /// Append every measurement of `run`, all or nothing
    ///
    /// Fails with `InvalidRun` for malformed runs or ordering/unit
    /// violations and with `ToolMismatch` when a benchmark name is already
    /// owned by another harness. For file-backed stores the new document is
    /// durable before this returns.
    pub fn append(&self, run: Run) -> Result<AppendReceipt> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.snapshot();
        current.check(&run)?;

        let commit = run.commit.short_id().to_string();
        let mut staged = (*current).clone();
        let positions = staged.apply(run);

        if let Some(path) = &self.path {
            staged.document.last_update = Some(Utc::now());
            self.write(path, &staged)?;
        }
        self.publish(staged);

        tracing::debug!(
            "Appended {} measurements for commit {} to suite '{}'",
            positions.len(),
            commit,
            self.suite
        );

        Ok(AppendReceipt {
            appended: positions.len(),
            positions,
        })
    }

    /// Full history of `name`, oldest first; empty for unknown names
    pub fn series(&self, name: &str) -> Vec<Entry> {
        self.snapshot().series(name)
    }

    /// The `count` entries of `name` that precede `position`, oldest first
    ///
    /// Baseline selection only needs this window, so it avoids copying the
    /// whole series.
    pub fn trailing(&self, name: &str, position: usize, count: usize) -> Vec<Entry> {
        self.snapshot().trailing(name, position, count)
    }

    /// Benchmark names in this suite, sorted
    pub fn benchmark_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.snapshot().index.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of entries across all series
    pub fn len(&self) -> usize {
        self.snapshot().entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of runs in this suite
    pub fn run_count(&self) -> usize {
        self.snapshot().runs.len()
    }

    /// All runs in append order
    pub fn runs(&self) -> Vec<Run> {
        self.snapshot()
            .runs
            .iter()
            .map(|run| run.as_ref().clone())
            .collect()
    }

    /// Instant of the last successful save
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.snapshot().document.last_update
    }

    /// Save to the backing file; no-op for in-memory stores
    pub fn save(&self) -> Result<()> {
        match &self.path {
            Some(path) => self.save_to(path),
            None => Ok(()),
        }
    }

    /// Save the current snapshot to `path`
    ///
    /// Writes a sibling temporary file and renames it over `path`, so a
    /// failure at any point leaves the previous file intact.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let mut staged = (*self.snapshot()).clone();
        staged.document.last_update = Some(Utc::now());
        self.write(path, &staged)?;
        self.publish(staged);
        Ok(())
    }

    fn write(&self, path: &Path, state: &HistoryState) -> Result<()> {
        let text = document::render_document(
            &state.document,
            &self.suite,
            state.runs.iter().map(|run| run.as_ref()),
            self.format,
        )
        .map_err(|e| HistoryError::corrupt(path, e))?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| HistoryError::storage(path, e))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| HistoryError::storage(path, e))?;
        tmp.write_all(text.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| HistoryError::storage(path, e))?;
        tmp.persist(path)
            .map_err(|e| HistoryError::storage(path, e.error))?;

        tracing::info!(
            "Saved {} runs for suite '{}' to {}",
            state.runs.len(),
            self.suite,
            path.display()
        );
        Ok(())
    }
}
