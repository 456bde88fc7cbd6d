//! Navigation adapter over a directory tree.
//!
//! Serves a local or mounted directory (a synced share, an exported
//! library) as the remote collection. Root entry URLs are `file://` URLs.
//! Downloads are copied in the background through a `.crdownload` partial
//! file that is renamed on completion, which is the same completion signal a
//! browser-driven backend produces.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

use super::{AdapterError, NavigationAdapter, RemoteEntry};
use crate::context::sanitize_segment;
use crate::download::partial_path;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// [`NavigationAdapter`] backed by the local filesystem.
#[derive(Debug, Default)]
pub struct DirectoryAdapter {
    stack: Vec<PathBuf>,
    transfer_delay: Duration,
}

impl DirectoryAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds each copy in its partial state for `delay` before completing it.
    #[must_use]
    pub fn with_transfer_delay(mut self, delay: Duration) -> Self {
        self.transfer_delay = delay;
        self
    }

    /// Directory the adapter is positioned at, if a root has been opened.
    #[must_use]
    pub fn current_dir(&self) -> Option<&Path> {
        self.stack.last().map(PathBuf::as_path)
    }

    fn current(&self) -> Result<&Path, AdapterError> {
        self.current_dir()
            .ok_or_else(|| AdapterError::navigation("<none>", "no root has been opened"))
    }
}

#[async_trait]
impl NavigationAdapter for DirectoryAdapter {
    async fn navigate(&mut self, url: &str) -> Result<(), AdapterError> {
        let parsed = Url::parse(url).map_err(|e| AdapterError::navigation(url, e.to_string()))?;
        if parsed.scheme() != "file" {
            return Err(AdapterError::navigation(
                url,
                format!("unsupported scheme `{}`, expected file://", parsed.scheme()),
            ));
        }
        let path = parsed
            .to_file_path()
            .map_err(|()| AdapterError::navigation(url, "not a local path"))?;
        debug!(path = %path.display(), "opening root directory");
        self.stack = vec![path];
        Ok(())
    }

    async fn wait_for_ready(&mut self, timeout: Duration) -> Result<bool, AdapterError> {
        let current = self.current()?.to_path_buf();
        let deadline = Instant::now() + timeout;
        loop {
            if fs::metadata(&current).await.is_ok_and(|m| m.is_dir()) {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(READY_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn list_current_level(&mut self) -> Result<Vec<RemoteEntry>, AdapterError> {
        let current = self.current()?.to_path_buf();
        let mut reader = fs::read_dir(&current)
            .await
            .map_err(|e| AdapterError::io(&current, e))?;

        let mut children: Vec<(String, bool)> = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| AdapterError::io(&current, e))?
        {
            let Ok(name) = entry.file_name().into_string() else {
                debug!(path = %entry.path().display(), "skipping non UTF-8 name");
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            // Follow symlinks so linked folders list as folders.
            let Ok(metadata) = fs::metadata(entry.path()).await else {
                continue;
            };
            children.push((name, metadata.is_dir()));
        }
        children.sort_by(|a, b| {
            a.0.to_lowercase()
                .cmp(&b.0.to_lowercase())
                .then_with(|| a.0.cmp(&b.0))
        });

        Ok(children
            .into_iter()
            .enumerate()
            .map(|(position, (name, is_dir))| {
                if is_dir {
                    RemoteEntry::folder(name, position)
                } else {
                    RemoteEntry::file(name, position)
                }
            })
            .collect())
    }

    async fn enter(&mut self, entry: &RemoteEntry) -> Result<(), AdapterError> {
        if !entry.is_folder() {
            return Err(AdapterError::navigation(&entry.name, "entry is not a folder"));
        }
        let path = self.current()?.join(&entry.name);
        if !fs::metadata(&path).await.is_ok_and(|m| m.is_dir()) {
            return Err(AdapterError::not_found(&entry.name));
        }
        self.stack.push(path);
        Ok(())
    }

    async fn go_back(&mut self) -> Result<(), AdapterError> {
        if self.stack.len() <= 1 {
            return Err(AdapterError::navigation(
                "..",
                "already at the top of the collection",
            ));
        }
        self.stack.pop();
        Ok(())
    }

    async fn trigger_download(
        &mut self,
        entry: &RemoteEntry,
        target_dir: &Path,
    ) -> Result<(), AdapterError> {
        let source = self.current()?.join(&entry.name);
        if !fs::metadata(&source).await.is_ok_and(|m| m.is_file()) {
            return Err(AdapterError::not_found(&entry.name));
        }
        fs::create_dir_all(target_dir)
            .await
            .map_err(|e| AdapterError::io(target_dir, e))?;

        let destination = target_dir.join(sanitize_segment(&entry.name));
        let partial = partial_path(&destination);
        let delay = self.transfer_delay;
        tokio::spawn(async move {
            if let Err(error) = copy_through_partial(&source, &partial, &destination, delay).await
            {
                warn!(
                    source = %source.display(),
                    error = %error,
                    "directory transfer failed"
                );
                let _ = fs::remove_file(&partial).await;
            }
        });
        Ok(())
    }
}

async fn copy_through_partial(
    source: &Path,
    partial: &Path,
    destination: &Path,
    delay: Duration,
) -> std::io::Result<()> {
    fs::copy(source, partial).await?;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    fs::rename(partial, destination).await
}
