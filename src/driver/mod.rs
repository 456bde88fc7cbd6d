//! Top-level sync loop over the configured roots.
//!
//! The driver loads the manifest once, walks each root in order and saves
//! after every root so a crash loses at most the root in progress. Failures
//! stay scoped to the root that hit them, except a lost adapter session,
//! which stops the run after one last save.

mod lock;
mod summary;

pub use lock::{LockError, RunLock};
pub use summary::{RootOutcome, RootReport, SyncSummary};

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::adapter::NavigationAdapter;
use crate::context::TraversalContext;
use crate::convert::ConversionDispatcher;
use crate::crawler::{CrawlError, CrawlSettings, TreeCrawler, WalkReport};
use crate::download::DownloadOrchestrator;
use crate::manifest::{Manifest, ManifestError, ManifestStore, timestamp_now};
use crate::wait::WaitPolicy;

/// Default wait for a root's view to become ready.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// A top-level remote collection and its entry URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootSpec {
    pub label: String,
    pub url: String,
}

impl RootSpec {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// Settings for a sync run.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Local directory mirroring the roots.
    pub target_dir: PathBuf,
    pub ready_timeout: Duration,
    pub listing_policy: WaitPolicy,
    pub max_depth: Option<usize>,
    /// Sync only this root when set.
    pub priority_root: Option<String>,
}

impl SyncSettings {
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            ready_timeout: DEFAULT_READY_TIMEOUT,
            listing_policy: WaitPolicy::default(),
            max_depth: None,
            priority_root: None,
        }
    }

    fn crawl_settings(&self) -> CrawlSettings {
        CrawlSettings {
            target_root: self.target_dir.clone(),
            listing_policy: self.listing_policy,
            max_depth: self.max_depth,
        }
    }
}

/// Errors that stop a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The adapter session was lost; the run stopped at `root`.
    #[error("sync stopped at root `{root}`: {source}")]
    Session {
        root: String,
        #[source]
        source: CrawlError,
    },

    #[error("unknown root `{label}`; configured roots: {known}")]
    UnknownRoot { label: String, known: String },

    #[error("no roots configured")]
    NoRoots,
}

/// Runs sync passes over one adapter session.
///
/// The driver owns the adapter, so a pass has exclusive use of the session.
pub struct SyncDriver<A: NavigationAdapter> {
    adapter: A,
    store: ManifestStore,
    settings: SyncSettings,
    orchestrator: DownloadOrchestrator,
    dispatcher: ConversionDispatcher,
}

impl<A: NavigationAdapter> SyncDriver<A> {
    pub fn new(adapter: A, store: ManifestStore, settings: SyncSettings) -> Self {
        Self {
            adapter,
            store,
            settings,
            orchestrator: DownloadOrchestrator::default(),
            dispatcher: ConversionDispatcher::disabled(),
        }
    }

    #[must_use]
    pub fn with_orchestrator(mut self, orchestrator: DownloadOrchestrator) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: ConversionDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn into_adapter(self) -> A {
        self.adapter
    }

    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Runs one pass over `roots`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Manifest`] if the manifest cannot be loaded,
    /// [`SyncError::UnknownRoot`] if the prioritized root is not configured
    /// and [`SyncError::Session`] if the adapter session is lost.
    #[instrument(skip_all, fields(roots = roots.len()))]
    pub async fn sync_all(&mut self, roots: &[RootSpec]) -> Result<SyncSummary, SyncError> {
        let selected = self.select_roots(roots)?;
        let mut manifest = self.store.load().await?;
        let crawl_settings = self.settings.crawl_settings();
        let mut summary = SyncSummary::default();

        for root in selected {
            info!(root = %root.label, "syncing root");
            let context = TraversalContext::root(&root.label);

            let (outcome, walk) = match self
                .sync_root(&mut manifest, root, &context, &crawl_settings)
                .await
            {
                Ok(result) => result,
                Err(source) => {
                    error!(root = %root.label, error = %source, "adapter session lost; stopping");
                    if let Err(save_error) = self.store.save(&manifest).await {
                        error!(error = %save_error, "final manifest save failed");
                    }
                    return Err(SyncError::Session {
                        root: root.label.clone(),
                        source,
                    });
                }
            };
            summary.roots.push(RootReport {
                label: root.label.clone(),
                outcome,
                walk,
            });
        }

        summary.last_sync_time = manifest.last_sync_time().map(str::to_string);
        let totals = summary.totals();
        info!(
            roots = summary.roots.len(),
            completed = summary.completed_roots(),
            downloaded = totals.files_downloaded,
            converted = totals.files_converted,
            timed_out = totals.files_timed_out,
            drift = totals.drift_events.len(),
            "sync pass finished"
        );
        Ok(summary)
    }

    fn select_roots<'r>(&self, roots: &'r [RootSpec]) -> Result<Vec<&'r RootSpec>, SyncError> {
        if roots.is_empty() {
            return Err(SyncError::NoRoots);
        }
        let Some(label) = &self.settings.priority_root else {
            return Ok(roots.iter().collect());
        };
        let selected: Vec<_> = roots.iter().filter(|root| &root.label == label).collect();
        if selected.is_empty() {
            return Err(SyncError::UnknownRoot {
                label: label.clone(),
                known: roots
                    .iter()
                    .map(|root| root.label.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        Ok(selected)
    }

    /// Walks one root. `Err` only for errors that must stop the run.
    async fn sync_root(
        &mut self,
        manifest: &mut Manifest,
        root: &RootSpec,
        context: &TraversalContext,
        crawl_settings: &CrawlSettings,
    ) -> Result<(RootOutcome, WalkReport), CrawlError> {
        if let Some(outcome) = self.open_root(root, context).await? {
            return Ok((outcome, WalkReport::default()));
        }

        let mut crawler = TreeCrawler::new(
            &mut self.adapter,
            manifest,
            &self.orchestrator,
            &self.dispatcher,
            crawl_settings,
        );
        let (mut outcome, walk) = match crawler.walk(context).await {
            Ok(walk) => (RootOutcome::Completed, walk),
            Err(error) if error.is_fatal() => return Err(error),
            Err(error) => {
                warn!(root = %root.label, error = %error, "root walk aborted");
                (
                    RootOutcome::Aborted {
                        reason: error.to_string(),
                    },
                    crawler.take_report(),
                )
            }
        };

        manifest.set_last_sync_time(timestamp_now());
        if let Err(error) = self.store.save(manifest).await {
            error!(
                root = %root.label,
                path = %self.store.path().display(),
                error = %error,
                "failed to persist manifest; previous file left intact"
            );
            outcome = RootOutcome::PersistFailed {
                reason: error.to_string(),
            };
        }
        Ok((outcome, walk))
    }

    /// Opens the root's entry URL. `Ok(Some(_))` means the root is skipped.
    async fn open_root(
        &mut self,
        root: &RootSpec,
        context: &TraversalContext,
    ) -> Result<Option<RootOutcome>, CrawlError> {
        if let Err(error) = self.adapter.navigate(&root.url).await {
            if error.is_fatal() {
                return Err(CrawlError::adapter(context, error));
            }
            warn!(root = %root.label, url = %root.url, error = %error, "cannot open root");
            return Ok(Some(RootOutcome::Unreachable {
                reason: error.to_string(),
            }));
        }
        match self.adapter.wait_for_ready(self.settings.ready_timeout).await {
            Ok(true) => Ok(None),
            Ok(false) => {
                warn!(
                    root = %root.label,
                    timeout_secs = self.settings.ready_timeout.as_secs_f64(),
                    "root did not become ready; skipping"
                );
                Ok(Some(RootOutcome::NavigationTimeout))
            }
            Err(error) if error.is_fatal() => Err(CrawlError::adapter(context, error)),
            Err(error) => {
                warn!(root = %root.label, error = %error, "root did not become ready; skipping");
                Ok(Some(RootOutcome::NavigationTimeout))
            }
        }
    }
}
