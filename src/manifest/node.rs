//! Manifest tree nodes and their persisted JSON shape.
//!
//! In memory a node keeps folders, file records and unknown keys apart. On
//! disk they share one JSON object: file records live under the reserved
//! [`FILE_RECORDS_KEY`], object values are folders, and everything else is
//! carried through untouched so newer writers do not lose data.
//!
//! A folder whose name is the records key, optionally preceded by
//! underscores, is written with one extra leading underscore and read back
//! without it, so every folder name round-trips.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Reserved key holding the file records of a node in the persisted document.
pub const FILE_RECORDS_KEY: &str = "__FileData__";

/// A persisted node had a shape this version cannot interpret.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct NodeFormatError(String);

/// One folder position in the mirrored hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct ManifestNode {
    folders: BTreeMap<String, ManifestNode>,
    files: BTreeMap<String, String>,
    extra: Map<String, Value>,
}

impl ManifestNode {
    /// Creates an empty node.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Child folders keyed by display name.
    #[must_use]
    pub fn folders(&self) -> &BTreeMap<String, ManifestNode> {
        &self.folders
    }

    /// File records: display name -> first-synced timestamp.
    #[must_use]
    pub fn files(&self) -> &BTreeMap<String, String> {
        &self.files
    }

    /// Keys this version does not interpret, kept for rewrite.
    #[must_use]
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Returns the child folder with the given name, if recorded.
    #[must_use]
    pub fn folder(&self, name: &str) -> Option<&ManifestNode> {
        self.folders.get(name)
    }

    /// Returns the child folder with the given name, creating it when absent.
    ///
    /// An unknown value stored under the folder's key is replaced.
    pub fn folder_mut(&mut self, name: &str) -> &mut ManifestNode {
        if !self.folders.contains_key(name) {
            self.extra.remove(&*escape_folder_key(name));
        }
        self.folders.entry(name.to_string()).or_default()
    }

    /// Whether a file with this display name has been synced at this node.
    #[must_use]
    pub fn has_file(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Records a synced file. Existing records keep their original timestamp.
    ///
    /// Returns `true` when the record is new.
    pub fn record_file(&mut self, name: &str, timestamp: &str) -> bool {
        if self.files.contains_key(name) {
            return false;
        }
        self.files.insert(name.to_string(), timestamp.to_string());
        true
    }

    /// Total number of file records in this subtree.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
            + self
                .folders
                .values()
                .map(ManifestNode::file_count)
                .sum::<usize>()
    }
}

/// Whether `key` is the records key preceded by zero or more underscores.
fn is_records_key_family(key: &str) -> bool {
    key.strip_suffix(FILE_RECORDS_KEY)
        .is_some_and(|prefix| prefix.chars().all(|c| c == '_'))
}

fn escape_folder_key(name: &str) -> Cow<'_, str> {
    if is_records_key_family(name) {
        Cow::Owned(format!("_{name}"))
    } else {
        Cow::Borrowed(name)
    }
}

/// Folder name a persisted key stands for; `None` for the records key.
fn folder_name_for_key(key: &str) -> Option<&str> {
    if key == FILE_RECORDS_KEY {
        None
    } else if is_records_key_family(key) {
        Some(&key[1..])
    } else {
        Some(key)
    }
}

impl TryFrom<Map<String, Value>> for ManifestNode {
    type Error = NodeFormatError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut node = Self::default();
        for (key, value) in map {
            let Some(folder) = folder_name_for_key(&key) else {
                let Value::Object(records) = value else {
                    return Err(NodeFormatError(format!(
                        "`{FILE_RECORDS_KEY}` must be an object of file name -> timestamp"
                    )));
                };
                for (name, stamp) in records {
                    let Value::String(stamp) = stamp else {
                        return Err(NodeFormatError(format!(
                            "file record `{name}` must have a string timestamp"
                        )));
                    };
                    node.files.insert(name, stamp);
                }
                continue;
            };
            match value {
                Value::Object(child) => {
                    node.folders
                        .insert(folder.to_string(), Self::try_from(child)?);
                }
                other => {
                    node.extra.insert(key, other);
                }
            }
        }
        Ok(node)
    }
}

impl Serialize for ManifestNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (name, child) in &self.folders {
            map.serialize_entry(&*escape_folder_key(name), child)?;
        }
        for (key, value) in &self.extra {
            // Folders and file records own their keys.
            let taken =
                folder_name_for_key(key).is_none_or(|name| self.folders.contains_key(name));
            if !taken {
                map.serialize_entry(key, value)?;
            }
        }
        map.serialize_entry(FILE_RECORDS_KEY, &self.files)?;
        map.end()
    }
}
