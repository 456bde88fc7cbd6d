//! Per-file download jobs and local artifact inspection.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::time::Instant;

/// Suffixes that mark a download still being written.
///
/// The first entry is the one browsers based on Chromium use and the one
/// [`partial_path`] produces.
pub const IN_PROGRESS_SUFFIXES: [&str; 4] = [".crdownload", ".part", ".partial", ".download"];

/// Path of the in-progress sibling for `artifact`.
#[must_use]
pub fn partial_path(artifact: &Path) -> PathBuf {
    with_suffix(artifact, IN_PROGRESS_SUFFIXES[0])
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(OsString::new, std::ffi::OsStr::to_os_string);
    name.push(suffix);
    path.with_file_name(name)
}

/// What the local directory shows for one expected artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    /// Nothing written yet.
    Missing,
    /// An in-progress marker sits next to the expected name.
    Partial,
    /// The file exists and no marker is present.
    Complete,
}

/// Inspects `artifact` and its in-progress siblings.
pub async fn inspect_artifact(artifact: &Path) -> ArtifactState {
    for suffix in IN_PROGRESS_SUFFIXES {
        if fs::try_exists(with_suffix(artifact, suffix))
            .await
            .unwrap_or(false)
        {
            return ArtifactState::Partial;
        }
    }
    match fs::metadata(artifact).await {
        Ok(metadata) if metadata.is_file() => ArtifactState::Complete,
        _ => ArtifactState::Missing,
    }
}

/// Lifecycle of one triggered download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Triggered, nothing observed on disk yet.
    Pending,
    /// A partial file has been observed.
    InProgress,
    /// The artifact is fully written.
    Completed,
    /// The batch budget ran out first.
    TimedOut,
}

/// One file of a batch, from trigger to completion or timeout.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    name: String,
    artifact: PathBuf,
    triggered_at: Instant,
    state: JobState,
}

impl DownloadJob {
    /// A freshly triggered job.
    pub fn pending(name: impl Into<String>, artifact: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            artifact: artifact.into(),
            triggered_at: Instant::now(),
            state: JobState::Pending,
        }
    }

    /// Remote display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Expected local file.
    #[must_use]
    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    #[must_use]
    pub fn state(&self) -> JobState {
        self.state
    }

    #[must_use]
    pub fn triggered_at(&self) -> Instant {
        self.triggered_at
    }

    /// Whether the job can no longer change state.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self.state, JobState::Completed | JobState::TimedOut)
    }

    /// Re-reads the artifact and advances the state. Settled jobs are left alone.
    pub async fn refresh(&mut self) -> JobState {
        if self.is_settled() {
            return self.state;
        }
        self.state = match inspect_artifact(&self.artifact).await {
            ArtifactState::Complete => JobState::Completed,
            ArtifactState::Partial => JobState::InProgress,
            ArtifactState::Missing => self.state,
        };
        self.state
    }

    /// Gives up on an unsettled job.
    pub fn time_out(&mut self) {
        if !self.is_settled() {
            self.state = JobState::TimedOut;
        }
    }
}
