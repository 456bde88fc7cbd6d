//! Depth-first walk of one root.
//!
//! At each level the crawler lists what the adapter shows, downloads the
//! files the manifest does not know yet, then descends into each folder in
//! presentation order. The adapter has a single physical position, so every
//! `enter` is paired with a `go_back` and the level is listed again after
//! each child, because the remote may re-render it differently.
//!
//! The next folder to visit is always the first name in the current listing
//! that has not been visited at this level yet. When the refreshed listing
//! holds fewer folders than before, a [`DriftEvent`] is recorded and the walk
//! continues with what is visible now.

mod drift;

pub use drift::DriftEvent;

use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::adapter::{AdapterError, NavigationAdapter, RemoteEntry, RemoteListing};
use crate::context::{TraversalContext, sanitize_segment};
use crate::convert::ConversionDispatcher;
use crate::download::{DownloadError, DownloadOrchestrator};
use crate::manifest::{Manifest, timestamp_now};
use crate::wait::WaitPolicy;

/// Errors that end the walk of a root.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The adapter session failed.
    #[error("adapter session lost at {path}: {source}")]
    Adapter {
        path: String,
        #[source]
        source: AdapterError,
    },

    /// Returning to a parent failed, so the adapter position is unknown.
    #[error("lost the remote position while leaving {path}: {source}")]
    PositionLost {
        path: String,
        #[source]
        source: AdapterError,
    },

    #[error(transparent)]
    Download(#[from] DownloadError),
}

impl CrawlError {
    pub(crate) fn adapter(context: &TraversalContext, source: AdapterError) -> Self {
        Self::Adapter {
            path: context.to_string(),
            source,
        }
    }

    /// Whether the whole run must stop, not just this root.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Adapter { .. } => true,
            Self::PositionLost { .. } => false,
            Self::Download(error) => error.is_fatal(),
        }
    }
}

/// Walk tuning shared by every root.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Local directory mirroring the remote roots.
    pub target_root: PathBuf,
    /// Retry policy for listings that come back empty.
    pub listing_policy: WaitPolicy,
    /// Deepest folder level entered below a root; `None` is unlimited.
    pub max_depth: Option<usize>,
}

impl CrawlSettings {
    pub fn new(target_root: impl Into<PathBuf>) -> Self {
        Self {
            target_root: target_root.into(),
            listing_policy: WaitPolicy::default(),
            max_depth: None,
        }
    }
}

/// Counters and events of one walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalkReport {
    pub folders_visited: usize,
    pub files_seen: usize,
    pub downloads_triggered: usize,
    /// New file records from completed downloads.
    pub files_downloaded: usize,
    pub files_converted: usize,
    pub files_timed_out: usize,
    pub trigger_failures: usize,
    /// Folders not entered because entering failed or `max_depth` was reached.
    pub skipped_folders: usize,
    pub drift_events: Vec<DriftEvent>,
}

impl WalkReport {
    /// Adds another report's counters and events to this one.
    pub fn merge(&mut self, other: WalkReport) {
        self.folders_visited += other.folders_visited;
        self.files_seen += other.files_seen;
        self.downloads_triggered += other.downloads_triggered;
        self.files_downloaded += other.files_downloaded;
        self.files_converted += other.files_converted;
        self.files_timed_out += other.files_timed_out;
        self.trigger_failures += other.trigger_failures;
        self.skipped_folders += other.skipped_folders;
        self.drift_events.extend(other.drift_events);
    }
}

type WalkFuture<'b> = Pin<Box<dyn Future<Output = Result<(), CrawlError>> + Send + 'b>>;

/// Recursive walker over one adapter session.
pub struct TreeCrawler<'a, A: NavigationAdapter + ?Sized> {
    adapter: &'a mut A,
    manifest: &'a mut Manifest,
    orchestrator: &'a DownloadOrchestrator,
    dispatcher: &'a ConversionDispatcher,
    settings: &'a CrawlSettings,
    report: WalkReport,
}

impl<'a, A: NavigationAdapter + ?Sized> TreeCrawler<'a, A> {
    pub fn new(
        adapter: &'a mut A,
        manifest: &'a mut Manifest,
        orchestrator: &'a DownloadOrchestrator,
        dispatcher: &'a ConversionDispatcher,
        settings: &'a CrawlSettings,
    ) -> Self {
        Self {
            adapter,
            manifest,
            orchestrator,
            dispatcher,
            settings,
            report: WalkReport::default(),
        }
    }

    /// Walks the subtree at `context`; the adapter must be positioned there.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError`] when the session fails or the adapter position
    /// is lost. Progress made before the error stays in the manifest and in
    /// [`TreeCrawler::take_report`].
    #[instrument(skip_all, fields(path = %context))]
    pub async fn walk(&mut self, context: &TraversalContext) -> Result<WalkReport, CrawlError> {
        self.walk_level(context).await?;
        let report = self.take_report();
        info!(
            folders = report.folders_visited,
            downloaded = report.files_downloaded,
            timed_out = report.files_timed_out,
            drift = report.drift_events.len(),
            "walk finished"
        );
        Ok(report)
    }

    /// Returns the counters gathered so far and resets them.
    pub fn take_report(&mut self) -> WalkReport {
        std::mem::take(&mut self.report)
    }

    fn walk_level<'b>(&'b mut self, context: &'b TraversalContext) -> WalkFuture<'b> {
        Box::pin(async move {
            let listing = self.list_level(context).await?;
            self.report.folders_visited += 1;
            self.manifest.node_mut(context);
            debug!(
                path = %context,
                folders = listing.folders.len(),
                files = listing.files.len(),
                "level listed"
            );

            self.sync_files(context, &listing.files).await?;

            if listing.folders.is_empty() {
                return Ok(());
            }
            if self
                .settings
                .max_depth
                .is_some_and(|max| context.depth() >= max)
            {
                debug!(path = %context, folders = listing.folders.len(), "max depth reached");
                self.report.skipped_folders += listing.folders.len();
                return Ok(());
            }

            let mut folders = listing.folders;
            let mut visited: HashSet<String> = HashSet::new();
            while let Some(next) = next_unvisited(&folders, &visited) {
                visited.insert(next.name.clone());
                let child = context.child(&next.name);
                match self.adapter.enter(&next).await {
                    Ok(()) => {}
                    Err(error) if error.is_fatal() => {
                        return Err(CrawlError::adapter(context, error));
                    }
                    Err(error) => {
                        warn!(path = %child, error = %error, "cannot enter folder, skipping");
                        self.report.skipped_folders += 1;
                        continue;
                    }
                }

                self.walk_level(&child).await?;

                if let Err(error) = self.adapter.go_back().await {
                    if error.is_fatal() {
                        return Err(CrawlError::adapter(&child, error));
                    }
                    return Err(CrawlError::PositionLost {
                        path: child.to_string(),
                        source: error,
                    });
                }

                let refreshed = self.list_level(context).await?.folders;
                if let Some(event) = DriftEvent::detect(context, folders.len(), refreshed.len()) {
                    warn!(
                        path = %context,
                        previous = event.previous,
                        current = event.current,
                        "folder listing shrank while walking; continuing with visible folders"
                    );
                    self.report.drift_events.push(event);
                }
                folders = refreshed;
            }
            Ok(())
        })
    }

    /// Lists the current level, retrying empty or transient results.
    async fn list_level(&mut self, context: &TraversalContext) -> Result<RemoteListing, CrawlError> {
        let policy = self.settings.listing_policy;
        let mut attempt = 1;
        loop {
            match self.adapter.list_current_level().await {
                Ok(entries) if !entries.is_empty() => return Ok(RemoteListing::partition(entries)),
                Ok(_) => debug!(path = %context, attempt, "listing empty"),
                Err(error) if error.is_fatal() => return Err(CrawlError::adapter(context, error)),
                Err(error) => {
                    debug!(path = %context, attempt, error = %error, "listing failed");
                }
            }
            if !policy.allows_retry_after(attempt) {
                debug!(path = %context, "treating level as empty");
                return Ok(RemoteListing::default());
            }
            policy.pause().await;
            attempt += 1;
        }
    }

    async fn sync_files(
        &mut self,
        context: &TraversalContext,
        files: &[RemoteEntry],
    ) -> Result<(), CrawlError> {
        if files.is_empty() {
            return Ok(());
        }
        self.report.files_seen += files.len();
        let target_dir = context.local_dir(&self.settings.target_root);

        let outcome = match self
            .orchestrator
            .run(
                &mut *self.adapter,
                files,
                &target_dir,
                self.manifest.node(context.segments()),
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(error) if error.is_fatal() => return Err(error.into()),
            Err(error) => {
                warn!(path = %context, error = %error, "skipping files of this folder");
                return Ok(());
            }
        };

        self.report.downloads_triggered += outcome.triggered;
        self.report.files_timed_out += outcome.timed_out.len();
        self.report.trigger_failures += outcome.failed.len();

        let stamp = timestamp_now();
        for name in &outcome.completed {
            if self.manifest.record_file(context, name, &stamp) {
                self.report.files_downloaded += 1;
            }
            let Some(converted) = self.dispatcher.converted_name(name) else {
                continue;
            };
            if self.manifest.has_file(context, &converted) {
                debug!(file = %name, converted = %converted, "converted name already synced");
                continue;
            }
            let local = target_dir.join(sanitize_segment(name));
            if self.dispatcher.maybe_convert(&local).await.is_some()
                && self.manifest.record_file(context, &converted, &stamp)
            {
                self.report.files_converted += 1;
            }
        }
        Ok(())
    }
}

fn next_unvisited(folders: &[RemoteEntry], visited: &HashSet<String>) -> Option<RemoteEntry> {
    folders
        .iter()
        .find(|folder| !visited.contains(&folder.name))
        .cloned()
}
