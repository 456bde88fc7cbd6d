//! Per-run results reported by the driver.

use serde::Serialize;

use crate::crawler::WalkReport;

/// How one root ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RootOutcome {
    /// Walked and persisted.
    Completed,
    /// The root's view never became ready.
    NavigationTimeout,
    /// The entry URL could not be opened.
    Unreachable { reason: String },
    /// The walk stopped early; progress up to that point was persisted.
    Aborted { reason: String },
    /// The walk ran but saving the manifest failed; the previous file is intact.
    PersistFailed { reason: String },
}

impl RootOutcome {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Result of one root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootReport {
    pub label: String,
    pub outcome: RootOutcome,
    pub walk: WalkReport,
}

/// Result of a whole `sync_all` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub roots: Vec<RootReport>,
    /// `lastSyncTime` after the run, if any root completed.
    pub last_sync_time: Option<String>,
}

impl SyncSummary {
    /// Walk counters summed over all roots.
    #[must_use]
    pub fn totals(&self) -> WalkReport {
        let mut totals = WalkReport::default();
        for root in &self.roots {
            totals.merge(root.walk.clone());
        }
        totals
    }

    #[must_use]
    pub fn completed_roots(&self) -> usize {
        self.roots
            .iter()
            .filter(|root| root.outcome.is_completed())
            .count()
    }

    /// Whether every root completed without timeouts or drift.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        let totals = self.totals();
        self.completed_roots() == self.roots.len()
            && totals.files_timed_out == 0
            && totals.trigger_failures == 0
            && totals.drift_events.is_empty()
    }

    /// Report for `label`, if that root was processed.
    #[must_use]
    pub fn root(&self, label: &str) -> Option<&RootReport> {
        self.roots.iter().find(|root| root.label == label)
    }
}
