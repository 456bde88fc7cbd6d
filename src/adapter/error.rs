//! Error types for navigation adapters.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by a [`NavigationAdapter`](super::NavigationAdapter).
///
/// Only [`AdapterError::Session`] is fatal for a run; every other variant is
/// handled at the smallest scope it affects (listing, folder, file, root).
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The UI has not rendered the expected element yet, or it went stale.
    #[error("remote view not ready: {detail}")]
    Transient {
        /// What was being waited for.
        detail: String,
    },

    /// The referenced entry is not present at the current position.
    #[error("entry not found at current position: {name}")]
    NotFound {
        /// Display name of the missing entry.
        name: String,
    },

    /// A navigation action (open, enter, back) did not take effect.
    #[error("navigation to {target} failed: {detail}")]
    Navigation {
        /// URL or entry name the action targeted.
        target: String,
        /// Reason reported by the backend.
        detail: String,
    },

    /// The automation session is gone; nothing further can be issued.
    #[error("adapter session failed: {detail}")]
    Session {
        /// Reason reported by the backend.
        detail: String,
    },

    /// Local filesystem error while serving an action.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl AdapterError {
    /// Creates a transient (not-ready / stale element) error.
    pub fn transient(detail: impl Into<String>) -> Self {
        Self::Transient {
            detail: detail.into(),
        }
    }

    /// Creates a not-found error for an entry name.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Creates a navigation error.
    pub fn navigation(target: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Navigation {
            target: target.into(),
            detail: detail.into(),
        }
    }

    /// Creates a fatal session error.
    pub fn session(detail: impl Into<String>) -> Self {
        Self::Session {
            detail: detail.into(),
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the whole run must stop.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Session { .. })
    }

    /// Whether waiting and asking again may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}
