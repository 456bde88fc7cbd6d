//! Error types for manifest persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or saving the manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Filesystem error while reading, writing, or replacing the manifest.
    #[error("IO error on manifest {path}: {source}")]
    Io {
        /// The file the operation was working on.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The persisted document exists but is not a valid manifest.
    #[error("manifest {path} is not valid: {source}")]
    Parse {
        /// The manifest file path.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The in-memory manifest could not be serialized.
    #[error("failed to serialize manifest: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl ManifestError {
    /// Creates an IO error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a parse error for the given manifest path.
    pub fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}
