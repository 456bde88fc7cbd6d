//! Loading and atomic saving of the manifest document.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use super::{Manifest, ManifestError};

/// File-backed manifest persistence.
///
/// Saves go through a temp file in the same directory that is flushed to
/// disk and then renamed over the target, so the manifest path always holds
/// either the previous or the new complete document.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    /// Creates a store for the manifest at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The manifest file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the manifest. A missing (or blank) file is an empty manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Io`] when the file exists but cannot be read
    /// and [`ManifestError::Parse`] when it is not a valid manifest.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<Manifest, ManifestError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!("no manifest yet, starting empty");
                return Ok(Manifest::default());
            }
            Err(error) => return Err(ManifestError::io(&self.path, error)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Manifest::default());
        }

        let manifest: Manifest =
            serde_json::from_slice(&bytes).map_err(|e| ManifestError::parse(&self.path, e))?;
        debug!(
            roots = manifest.roots().len(),
            files = manifest.file_count(),
            "manifest loaded"
        );
        Ok(manifest)
    }

    /// Writes `manifest` atomically.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] if serialization, the temp write, or the
    /// final rename fails. The previously saved document is untouched.
    pub async fn save(&self, manifest: &Manifest) -> Result<(), ManifestError> {
        self.stage(manifest).await?.commit().await
    }

    /// Writes `manifest` to a durable temp file without replacing the target.
    ///
    /// Dropping the returned value without [`StagedManifest::commit`]
    /// discards the temp file.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] if the document cannot be serialized or
    /// the temp file cannot be written and flushed.
    pub async fn stage(&self, manifest: &Manifest) -> Result<StagedManifest, ManifestError> {
        let body = serde_json::to_vec_pretty(manifest).map_err(ManifestError::Serialize)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ManifestError::io(parent, e))?;
        }

        let staged = StagedManifest {
            temp_path: self.temp_path(),
            target: self.path.clone(),
            committed: false,
        };
        write_durably(&staged.temp_path, &body)
            .await
            .map_err(|e| ManifestError::io(&staged.temp_path, e))?;
        Ok(staged)
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map_or_else(|| "manifest".into(), |name| name.to_string_lossy());
        let suffix: u64 = rand::random();
        self.path
            .with_file_name(format!(".{file_name}.{suffix:016x}.tmp"))
    }
}

async fn write_durably(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(body).await?;
    file.sync_all().await
}

/// A fully written manifest waiting to replace the current one.
#[derive(Debug)]
pub struct StagedManifest {
    temp_path: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedManifest {
    /// Path of the staged temp file.
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Renames the staged document over the manifest path.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Io`] if the rename fails; the target keeps
    /// its previous content.
    pub async fn commit(mut self) -> Result<(), ManifestError> {
        fs::rename(&self.temp_path, &self.target)
            .await
            .map_err(|e| ManifestError::io(&self.target, e))?;
        self.committed = true;
        debug!(path = %self.target.display(), "manifest saved");
        Ok(())
    }
}

impl Drop for StagedManifest {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(error) = std::fs::remove_file(&self.temp_path)
            && error.kind() != std::io::ErrorKind::NotFound
        {
            warn!(
                path = %self.temp_path.display(),
                error = %error,
                "failed to remove staged manifest"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::context::TraversalContext;
    use tempfile::TempDir;

    fn sample_manifest() -> Manifest {
        let mut manifest = Manifest::default();
        manifest.record_file(
            &TraversalContext::root("Biology"),
            "syllabus.pdf",
            "2024-09-01 09:00:00",
        );
        manifest
    }

    #[tokio::test]
    async fn test_load_missing_file_returns_empty() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::new(dir.path().join("manifest.json"));
        let manifest = store.load().await.unwrap();
        assert_eq!(manifest, Manifest::default());
    }

    #[tokio::test]
    async fn test_load_blank_file_returns_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, "\n  \n").unwrap();
        let manifest = ManifestStore::new(&path).load().await.unwrap();
        assert_eq!(manifest, Manifest::default());
    }

    #[tokio::test]
    async fn test_load_corrupt_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, "{\"Biology\": {").unwrap();

        let result = ManifestStore::new(&path).load().await;

        assert!(matches!(result, Err(ManifestError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::new(dir.path().join("state").join("manifest.json"));
        let manifest = sample_manifest();

        store.save(&manifest).await.unwrap();

        assert_eq!(store.load().await.unwrap(), manifest);
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::new(dir.path().join("manifest.json"));
        store.save(&sample_manifest()).await.unwrap();
        store.save(&sample_manifest()).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["manifest.json"]);
    }

    #[tokio::test]
    async fn test_dropped_stage_keeps_previous_document() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::new(dir.path().join("manifest.json"));
        store.save(&Manifest::default()).await.unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let staged = store.stage(&sample_manifest()).await.unwrap();
        let temp = staged.temp_path().to_path_buf();
        assert!(temp.exists());
        drop(staged);

        assert!(!temp.exists());
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_commit_failure_keeps_previous_document() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("manifest.json");
        // A non-empty directory at the target makes the rename fail.
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), b"x").unwrap();
        let store = ManifestStore::new(&target);

        let result = store.save(&sample_manifest()).await;

        assert!(matches!(result, Err(ManifestError::Io { .. })));
        assert!(target.join("keep").exists());
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "staged temp file should be cleaned up");
    }
}
