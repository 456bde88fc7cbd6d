//! Download orchestration for one node's batch of new files.
//!
//! # Overview
//!
//! For every unsynced file at a node the orchestrator asks the navigation
//! adapter to start a download, then polls the local target directory until
//! each expected file is fully written or the batch budget is spent:
//!
//! - a file with an in-progress marker next to it (`.crdownload`, `.part`,
//!   ...) is still being written
//! - a file without a marker is complete
//! - anything unfinished at the deadline is timed out and left for the next
//!   sync, which is the retry mechanism
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::time::Duration;
//! use docmirror_core::adapter::{DirectoryAdapter, NavigationAdapter, RemoteEntry};
//! use docmirror_core::download::DownloadOrchestrator;
//! use docmirror_core::wait::DownloadPolicy;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut adapter = DirectoryAdapter::new();
//! adapter.navigate("file:///srv/share/Biology/").await?;
//!
//! let orchestrator = DownloadOrchestrator::new(DownloadPolicy::new(
//!     Duration::from_secs(60),
//!     Duration::from_secs(1),
//! ));
//! let batch = [RemoteEntry::file("syllabus.pdf", 0)];
//! let outcome = orchestrator
//!     .run(&mut adapter, &batch, Path::new("./mirror/Biology"), None)
//!     .await?;
//! println!("completed: {:?}", outcome.completed);
//! # Ok(())
//! # }
//! ```

mod error;
mod job;
mod orchestrator;

pub use error::DownloadError;
pub use job::{
    ArtifactState, DownloadJob, IN_PROGRESS_SUFFIXES, JobState, inspect_artifact, partial_path,
};
pub use orchestrator::{BatchOutcome, DownloadOrchestrator};
