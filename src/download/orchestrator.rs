//! Trigger-then-poll download batches.
//!
//! The remote offers no completion callback: a trigger only asks the UI to
//! start a download. Completion is observed on disk by polling the target
//! directory until every expected file exists without an in-progress marker
//! or the batch budget runs out.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tokio::fs;
use tracing::{debug, info, instrument, warn};

use super::job::{ArtifactState, DownloadJob, JobState, inspect_artifact};
use super::DownloadError;
use crate::adapter::{NavigationAdapter, RemoteEntry};
use crate::context::sanitize_segment;
use crate::manifest::ManifestNode;
use crate::wait::DownloadPolicy;

/// Result of one node's batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Names whose artifact is complete, in batch order.
    pub completed: Vec<String>,
    /// Names still unfinished when the budget ran out.
    pub timed_out: Vec<String>,
    /// Names whose trigger was rejected by the adapter, or whose local file
    /// name is already taken by another entry of the same folder.
    pub failed: Vec<String>,
    /// Completed names that were already on disk and were not re-triggered.
    pub adopted: Vec<String>,
    /// Number of triggers issued.
    pub triggered: usize,
}

impl BatchOutcome {
    /// Whether every file of the batch completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.timed_out.is_empty() && self.failed.is_empty()
    }
}

/// Issues download triggers for a batch and confirms them on disk.
///
/// The orchestrator never touches the manifest; it only reports which names
/// completed so the caller can record them.
#[derive(Debug, Clone, Default)]
pub struct DownloadOrchestrator {
    policy: DownloadPolicy,
}

impl DownloadOrchestrator {
    #[must_use]
    pub fn new(policy: DownloadPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> DownloadPolicy {
        self.policy
    }

    /// Downloads the files of `batch` into `target_dir`.
    ///
    /// Entries already recorded in `known` are skipped without a trigger.
    /// The adapter must be positioned at the level the batch was listed from.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::TargetDir`] if `target_dir` cannot be created
    /// and [`DownloadError::Session`] if the adapter session fails.
    #[instrument(skip_all, fields(dir = %target_dir.display(), batch = batch.len()))]
    pub async fn run<A>(
        &self,
        adapter: &mut A,
        batch: &[RemoteEntry],
        target_dir: &Path,
        known: Option<&ManifestNode>,
    ) -> Result<BatchOutcome, DownloadError>
    where
        A: NavigationAdapter + ?Sized,
    {
        let mut outcome = BatchOutcome::default();
        let files: Vec<&RemoteEntry> = batch.iter().filter(|entry| !entry.is_folder()).collect();
        let is_known = |entry: &RemoteEntry| known.is_some_and(|node| node.has_file(&entry.name));

        // Local file name -> remote name it belongs to. Recorded files claim
        // their name first so a new entry never adopts their artifact.
        let mut owners: HashMap<String, &str> = HashMap::new();
        for &entry in files.iter().filter(|&&entry| is_known(entry)) {
            owners
                .entry(sanitize_segment(&entry.name))
                .or_insert(entry.name.as_str());
        }

        let mut seen = HashSet::new();
        let mut pending: Vec<&RemoteEntry> = Vec::new();
        for entry in files {
            if is_known(entry) {
                continue;
            }
            let local = sanitize_segment(&entry.name);
            let owner = *owners.entry(local).or_insert(entry.name.as_str());
            if owner != entry.name {
                warn!(
                    file = %entry.name,
                    taken_by = %owner,
                    "local file name already used by another entry, skipping"
                );
                outcome.failed.push(entry.name.clone());
                continue;
            }
            if seen.insert(entry.name.as_str()) {
                pending.push(entry);
            }
        }
        if pending.is_empty() {
            return Ok(outcome);
        }

        fs::create_dir_all(target_dir)
            .await
            .map_err(|e| DownloadError::target_dir(target_dir, e))?;

        let mut jobs = Vec::with_capacity(pending.len());
        for entry in pending {
            let artifact = target_dir.join(sanitize_segment(&entry.name));
            if inspect_artifact(&artifact).await == ArtifactState::Complete {
                debug!(file = %entry.name, "already on disk, adopting without trigger");
                outcome.adopted.push(entry.name.clone());
                outcome.completed.push(entry.name.clone());
                continue;
            }

            match adapter.trigger_download(entry, target_dir).await {
                Ok(()) => {
                    debug!(file = %entry.name, "download triggered");
                    outcome.triggered += 1;
                    jobs.push(DownloadJob::pending(&entry.name, artifact));
                }
                Err(error) if error.is_fatal() => return Err(DownloadError::Session(error)),
                Err(error) => {
                    warn!(file = %entry.name, error = %error, "download trigger failed");
                    outcome.failed.push(entry.name.clone());
                }
            }
        }

        self.await_jobs(&mut jobs).await;

        for job in jobs {
            match job.state() {
                JobState::Completed => outcome.completed.push(job.name().to_string()),
                _ => outcome.timed_out.push(job.name().to_string()),
            }
        }

        if outcome.timed_out.is_empty() {
            if outcome.triggered > 0 {
                info!(count = outcome.triggered, "downloads completed");
            }
        } else {
            warn!(
                timed_out = outcome.timed_out.len(),
                completed = outcome.completed.len(),
                timeout_secs = self.policy.batch_timeout().as_secs_f64(),
                "download batch timed out; remaining files will be retried next sync"
            );
        }
        Ok(outcome)
    }

    async fn await_jobs(&self, jobs: &mut [DownloadJob]) {
        if jobs.is_empty() {
            return;
        }
        let deadline = self.policy.deadline();
        loop {
            for job in jobs.iter_mut() {
                job.refresh().await;
            }
            if jobs.iter().all(|job| job.state() == JobState::Completed) {
                return;
            }
            if !self.policy.tick(deadline).await {
                break;
            }
        }
        // One last look so a file finishing on the final tick still counts.
        for job in jobs.iter_mut() {
            job.refresh().await;
            job.time_out();
        }
    }
}
