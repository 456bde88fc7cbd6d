//! Shared fixtures for integration tests: a scripted in-memory remote and a
//! converter that writes placeholder PDFs.
//!
//! Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use docmirror_core::adapter::{AdapterError, NavigationAdapter, RemoteEntry};
use docmirror_core::convert::{ConvertError, Converter};
use docmirror_core::download::partial_path;

/// One folder of a scripted remote tree.
#[derive(Debug, Clone, Default)]
pub struct Folder {
    folders: Vec<(String, Folder)>,
    files: Vec<String>,
}

impl Folder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, name: &str) -> Self {
        self.files.push(name.to_string());
        self
    }

    pub fn folder(mut self, name: &str, child: Folder) -> Self {
        self.folders.push((name.to_string(), child));
        self
    }

    fn child(&self, name: &str) -> Option<&Folder> {
        self.folders
            .iter()
            .find(|(folder, _)| folder == name)
            .map(|(_, child)| child)
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut Folder> {
        self.folders
            .iter_mut()
            .find(|(folder, _)| folder == name)
            .map(|(_, child)| child)
    }

    fn entries(&self) -> Vec<RemoteEntry> {
        let folders = self.folders.iter().map(|(name, _)| name);
        let mut entries: Vec<RemoteEntry> = folders
            .enumerate()
            .map(|(i, name)| RemoteEntry::folder(name.clone(), i))
            .collect();
        let offset = entries.len();
        entries.extend(
            self.files
                .iter()
                .enumerate()
                .map(|(i, name)| RemoteEntry::file(name.clone(), offset + i)),
        );
        entries
    }
}

/// In-memory remote UI driven like the real one: one position at a time.
#[derive(Debug, Default)]
pub struct ScriptedRemote {
    roots: HashMap<String, Folder>,
    current_url: Option<String>,
    path: Vec<String>,
    /// File names whose downloads never finish.
    pub stalled: HashSet<String>,
    /// Root URLs whose view never becomes ready.
    pub unready: HashSet<String>,
    /// Root URL at which the session dies on the first listing.
    pub session_lost_at: Option<String>,
    /// `(level path, folder)`: the folder disappears from that level the
    /// first time the adapter returns to it.
    pub vanish_on_back: Option<(Vec<String>, String)>,
    /// Every trigger as `<url>/<folder path>/<file>`.
    pub triggers: Vec<String>,
    /// Every `enter` as the resulting slash-joined folder path.
    pub entered: Vec<String>,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, url: &str, tree: Folder) -> Self {
        self.roots.insert(url.to_string(), tree);
        self
    }

    fn level(&self) -> Option<&Folder> {
        let url = self.current_url.as_ref()?;
        self.path
            .iter()
            .try_fold(self.roots.get(url)?, |folder, name| folder.child(name))
    }

    fn level_at_mut(&mut self, path: &[String]) -> Option<&mut Folder> {
        let url = self.current_url.as_ref()?;
        path.iter()
            .try_fold(self.roots.get_mut(url)?, |folder, name| folder.child_mut(name))
    }

    fn here(&self) -> String {
        let url = self.current_url.as_deref().unwrap_or_default();
        if self.path.is_empty() {
            url.to_string()
        } else {
            format!("{url}/{}", self.path.join("/"))
        }
    }
}

#[async_trait]
impl NavigationAdapter for ScriptedRemote {
    async fn navigate(&mut self, url: &str) -> Result<(), AdapterError> {
        if !self.roots.contains_key(url) {
            return Err(AdapterError::navigation(url, "no such page"));
        }
        self.current_url = Some(url.to_string());
        self.path.clear();
        Ok(())
    }

    async fn wait_for_ready(&mut self, _timeout: Duration) -> Result<bool, AdapterError> {
        let url = self.current_url.clone().unwrap_or_default();
        Ok(!self.unready.contains(&url))
    }

    async fn list_current_level(&mut self) -> Result<Vec<RemoteEntry>, AdapterError> {
        if self.session_lost_at.is_some() && self.session_lost_at == self.current_url {
            return Err(AdapterError::session("browser window closed"));
        }
        Ok(self.level().map(Folder::entries).unwrap_or_default())
    }

    async fn enter(&mut self, entry: &RemoteEntry) -> Result<(), AdapterError> {
        let exists = self
            .level()
            .is_some_and(|level| level.child(&entry.name).is_some());
        if !exists {
            return Err(AdapterError::not_found(&entry.name));
        }
        self.path.push(entry.name.clone());
        self.entered.push(self.path.join("/"));
        Ok(())
    }

    async fn go_back(&mut self) -> Result<(), AdapterError> {
        if self.path.pop().is_none() {
            return Err(AdapterError::navigation("..", "already at the root"));
        }
        if let Some((level, folder)) = self.vanish_on_back.take() {
            if level == self.path {
                let path = self.path.clone();
                if let Some(parent) = self.level_at_mut(&path) {
                    parent.folders.retain(|(name, _)| name != &folder);
                }
            } else {
                self.vanish_on_back = Some((level, folder));
            }
        }
        Ok(())
    }

    async fn trigger_download(
        &mut self,
        entry: &RemoteEntry,
        target_dir: &Path,
    ) -> Result<(), AdapterError> {
        let listed = self
            .level()
            .is_some_and(|level| level.files.contains(&entry.name));
        if !listed {
            return Err(AdapterError::not_found(&entry.name));
        }
        self.triggers.push(format!("{}/{}", self.here(), entry.name));

        let artifact = target_dir.join(&entry.name);
        let partial = partial_path(&artifact);
        if self.stalled.contains(&entry.name) {
            std::fs::write(&partial, b"partial").map_err(|e| AdapterError::io(&partial, e))?;
        } else {
            let _ = std::fs::remove_file(&partial);
            std::fs::write(&artifact, entry.name.as_bytes())
                .map_err(|e| AdapterError::io(&artifact, e))?;
        }
        Ok(())
    }
}

/// Converter writing `<stem>.pdf` next to the source, or failing on request.
#[derive(Debug, Default)]
pub struct FakeConverter {
    pub fail: bool,
    pub converted: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl Converter for FakeConverter {
    async fn convert(&self, source: &Path) -> Result<PathBuf, ConvertError> {
        if self.fail {
            return Err(ConvertError::missing_output(source.with_extension("pdf")));
        }
        let output = source.with_extension("pdf");
        std::fs::write(&output, b"%PDF-1.4").expect("write converted pdf");
        self.converted
            .lock()
            .expect("converter lock")
            .push(source.to_path_buf());
        Ok(output)
    }
}

/// The tree used by most scenarios: `Biology` has `Unit1/notes.docx` and
/// `syllabus.pdf`.
pub fn biology_tree() -> Folder {
    Folder::new()
        .folder("Unit1", Folder::new().file("notes.docx"))
        .file("syllabus.pdf")
}

/// A file URL string for `path`, for the directory adapter.
pub fn file_url(path: &Path) -> String {
    url::Url::from_directory_path(path)
        .expect("absolute directory path")
        .to_string()
}
