//! Error types for the download orchestrator.

use std::path::PathBuf;

use thiserror::Error;

use crate::adapter::AdapterError;

/// Errors that stop a whole download batch.
///
/// Per-file problems (a trigger that fails, a file that never completes) are
/// not errors; they are reported in the batch outcome.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The local target directory could not be created.
    #[error("cannot create download directory {path}: {source}")]
    TargetDir {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The adapter session failed while triggering downloads.
    #[error("adapter session lost during download batch: {0}")]
    Session(#[source] AdapterError),
}

impl DownloadError {
    /// Creates a target directory error.
    pub fn target_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::TargetDir {
            path: path.into(),
            source,
        }
    }

    /// Whether the run must stop rather than skip this batch.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Session(_))
    }
}
