//! Persisted record of what has been mirrored.
//!
//! The manifest mirrors the remote hierarchy: one [`ManifestNode`] per root,
//! nested folders below it, and per-node file records mapping a file's
//! display name to the time it was first synced. A name present in a node's
//! records is never downloaded again.
//!
//! # Example
//!
//! ```
//! use docmirror_core::TraversalContext;
//! use docmirror_core::manifest::Manifest;
//!
//! let mut manifest = Manifest::default();
//! let unit = TraversalContext::root("Biology").child("Unit1");
//!
//! assert!(manifest.record_file(&unit, "notes.docx", "2024-09-01 10:00:00"));
//! assert!(manifest.has_file(&unit, "notes.docx"));
//! assert!(!manifest.record_file(&unit, "notes.docx", "2025-01-01 00:00:00"));
//! ```

mod error;
mod listing;
mod node;
mod store;

pub use error::ManifestError;
pub use listing::{EntryQuery, SortKey};
pub use node::{FILE_RECORDS_KEY, ManifestNode, NodeFormatError};
pub use store::{ManifestStore, StagedManifest};

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::context::TraversalContext;

/// Top-level key holding the time of the last completed root.
pub const LAST_SYNC_KEY: &str = "lastSyncTime";

/// Format of every timestamp the manifest stores.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time in [`TIMESTAMP_FORMAT`].
#[must_use]
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// The full sync record: one tree per root plus run metadata.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Manifest {
    roots: BTreeMap<String, ManifestNode>,
    last_sync_time: Option<String>,
    extra: Map<String, Value>,
}

impl TryFrom<Map<String, Value>> for Manifest {
    type Error = NodeFormatError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut manifest = Self::default();
        for (key, value) in map {
            match (key.as_str(), value) {
                (LAST_SYNC_KEY, Value::String(stamp)) => manifest.last_sync_time = Some(stamp),
                (_, Value::Object(tree)) => {
                    manifest.roots.insert(key, ManifestNode::try_from(tree)?);
                }
                (_, other) => {
                    manifest.extra.insert(key, other);
                }
            }
        }
        Ok(manifest)
    }
}

impl Serialize for Manifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (label, node) in &self.roots {
            map.serialize_entry(label, node)?;
        }
        for (key, value) in &self.extra {
            let taken = self.roots.contains_key(key)
                || (key == LAST_SYNC_KEY && self.last_sync_time.is_some());
            if !taken {
                map.serialize_entry(key, value)?;
            }
        }
        if let Some(stamp) = &self.last_sync_time {
            map.serialize_entry(LAST_SYNC_KEY, stamp)?;
        }
        map.end()
    }
}

impl Manifest {
    /// Root trees keyed by label.
    #[must_use]
    pub fn roots(&self) -> &BTreeMap<String, ManifestNode> {
        &self.roots
    }

    /// The tree recorded for a root label.
    #[must_use]
    pub fn root(&self, label: &str) -> Option<&ManifestNode> {
        self.roots.get(label)
    }

    /// Time the last root finished syncing, if any.
    #[must_use]
    pub fn last_sync_time(&self) -> Option<&str> {
        self.last_sync_time.as_deref()
    }

    /// Sets the global last-sync stamp.
    ///
    /// Replaces any unreadable value stored under the same key.
    pub fn set_last_sync_time(&mut self, stamp: impl Into<String>) {
        self.extra.remove(LAST_SYNC_KEY);
        self.last_sync_time = Some(stamp.into());
    }

    /// Unknown top-level keys kept for rewrite.
    #[must_use]
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Looks up the node at `segments` (root label first) without creating it.
    #[must_use]
    pub fn node<S: AsRef<str>>(&self, segments: &[S]) -> Option<&ManifestNode> {
        let (root, folders) = segments.split_first()?;
        folders
            .iter()
            .try_fold(self.roots.get(root.as_ref())?, |node, name| {
                node.folder(name.as_ref())
            })
    }

    /// Returns the node at the context's position, creating missing nodes.
    pub fn node_mut(&mut self, context: &TraversalContext) -> &mut ManifestNode {
        if !self.roots.contains_key(context.root_label()) {
            self.extra.remove(context.root_label());
        }
        let root = self
            .roots
            .entry(context.root_label().to_string())
            .or_default();
        context
            .folders()
            .iter()
            .fold(root, |node, name| node.folder_mut(name))
    }

    /// Whether `name` has been synced at the context's node.
    #[must_use]
    pub fn has_file(&self, context: &TraversalContext, name: &str) -> bool {
        self.node(context.segments())
            .is_some_and(|node| node.has_file(name))
    }

    /// Records `name` as synced at the context's node.
    ///
    /// Returns `true` when the record is new; an existing record keeps its
    /// first timestamp.
    pub fn record_file(&mut self, context: &TraversalContext, name: &str, timestamp: &str) -> bool {
        self.node_mut(context).record_file(name, timestamp)
    }

    /// Total number of file records across all roots.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.roots.values().map(ManifestNode::file_count).sum()
    }

    /// Flattens every file record into a row.
    #[must_use]
    pub fn entries(&self) -> Vec<ManifestEntry> {
        let mut rows = Vec::new();
        for (label, node) in &self.roots {
            collect_entries(node, label, label, &mut rows);
        }
        rows
    }
}

fn collect_entries(node: &ManifestNode, root: &str, folder: &str, rows: &mut Vec<ManifestEntry>) {
    for (name, synced_at) in node.files() {
        rows.push(ManifestEntry {
            name: name.clone(),
            root: root.to_string(),
            folder: folder.to_string(),
            synced_at: synced_at.clone(),
        });
    }
    for (child_name, child) in node.folders() {
        let child_folder = format!("{folder}/{child_name}");
        collect_entries(child, root, &child_folder, rows);
    }
}

/// One synced file as a flat row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    /// File display name.
    pub name: String,
    /// Root label the file belongs to.
    pub root: String,
    /// Slash-joined folder path, starting with the root label.
    pub folder: String,
    /// First-synced timestamp.
    pub synced_at: String,
}
