//! Boundary to the remote UI.
//!
//! The engine never talks to the remote service directly. It drives a
//! [`NavigationAdapter`], which has exactly one navigable position at a time:
//! list what is visible there, enter a folder, go back, trigger a download.
//! Methods take `&mut self`, so two remote interactions can never be in
//! flight against the same session.
//!
//! - [`NavigationAdapter`] - async trait every backend implements
//! - [`RemoteEntry`] / [`RemoteListing`] - what one level shows
//! - [`DirectoryAdapter`] - backend that serves a local or mounted directory
//!   tree as the remote

mod directory;
mod error;

pub use directory::DirectoryAdapter;
pub use error::AdapterError;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

/// Whether an entry is a folder or a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Folder,
    File,
}

/// One visible child at the current position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Display name as shown by the remote.
    pub name: String,
    pub kind: EntryKind,
    /// Index in presentation order at the time of listing.
    pub position: usize,
}

impl RemoteEntry {
    pub fn folder(name: impl Into<String>, position: usize) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Folder,
            position,
        }
    }

    pub fn file(name: impl Into<String>, position: usize) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            position,
        }
    }

    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

/// A level's children split into folders and files, each in presentation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteListing {
    pub folders: Vec<RemoteEntry>,
    pub files: Vec<RemoteEntry>,
}

impl RemoteListing {
    /// Partitions a raw listing, keeping relative order.
    #[must_use]
    pub fn partition(entries: Vec<RemoteEntry>) -> Self {
        let (folders, files) = entries.into_iter().partition(RemoteEntry::is_folder);
        Self { folders, files }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.files.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.folders.len() + self.files.len()
    }
}

/// Capability the engine needs from a remote UI session.
#[async_trait]
pub trait NavigationAdapter: Send {
    /// Opens a root's entry URL.
    async fn navigate(&mut self, url: &str) -> Result<(), AdapterError>;

    /// Waits until the current view shows its listing, up to `timeout`.
    ///
    /// Returns `Ok(false)` when the view did not become ready in time.
    async fn wait_for_ready(&mut self, timeout: Duration) -> Result<bool, AdapterError>;

    /// Lists the children visible at the current position, in presentation order.
    async fn list_current_level(&mut self) -> Result<Vec<RemoteEntry>, AdapterError>;

    /// Opens a folder entry of the current level.
    async fn enter(&mut self, entry: &RemoteEntry) -> Result<(), AdapterError>;

    /// Returns to the parent of the current position.
    async fn go_back(&mut self) -> Result<(), AdapterError>;

    /// Starts downloading a file entry of the current level into `target_dir`.
    ///
    /// Completion is observed through the filesystem, not through this call.
    async fn trigger_download(
        &mut self,
        entry: &RemoteEntry,
        target_dir: &Path,
    ) -> Result<(), AdapterError>;
}
