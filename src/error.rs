//! Error taxonomy for the history store and ingestion pipeline

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while ingesting runs or persisting history
#[derive(Error, Debug)]
pub enum HistoryError {
    /// Malformed or empty run, rejected before any mutation
    #[error("Invalid run: {0}")]
    InvalidRun(String),

    /// Benchmark name already recorded under a different harness
    #[error("Benchmark '{name}' belongs to tool '{expected}', refusing measurement from '{found}'")]
    ToolMismatch {
        name: String,
        expected: String,
        found: String,
    },

    /// I/O or decoding failure on load/save
    #[error("Storage failure at {}: {source}", path.display())]
    StorageFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid threshold policy or pipeline configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl HistoryError {
    pub(crate) fn storage(path: &Path, source: std::io::Error) -> Self {
        HistoryError::StorageFailure {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Wrap a decoding problem as an `InvalidData` storage failure
    pub(crate) fn corrupt(path: &Path, reason: impl std::fmt::Display) -> Self {
        Self::storage(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidData, reason.to_string()),
        )
    }
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;
