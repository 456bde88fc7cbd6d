//! Advisory lock held for the duration of a sync run.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LockError {
    /// Another process holds the lock.
    #[error("another sync is already running (lock held on {})", path.display())]
    AlreadyRunning { path: PathBuf },

    #[error("cannot open lock file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LockError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Exclusive lock on a file; released when dropped.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Takes the lock at `path` without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::AlreadyRunning`] when another process holds it.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, LockError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| LockError::io(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| LockError::io(&path, e))?;

        if let Err(error) = file.try_lock_exclusive() {
            if error.kind() == fs2::lock_contended_error().kind() {
                return Err(LockError::AlreadyRunning { path });
            }
            return Err(LockError::io(&path, error));
        }

        // Best effort; the lock itself is what matters.
        let _ = file.set_len(0);
        let _ = writeln!(file, "{}", std::process::id());
        debug!(path = %path.display(), "run lock acquired");
        Ok(Self { file, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
