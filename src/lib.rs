//! Docmirror Core Library
//!
//! Incrementally mirrors a remote, hierarchically organized document
//! collection onto local storage. The remote offers no listing API, only a
//! stateful UI, so the tree is rediscovered on every run by driving a
//! [`NavigationAdapter`] one level at a time, and a persisted manifest
//! records which files have already been fetched.
//!
//! # Architecture
//!
//! - [`manifest`] - in-memory sync record and atomic JSON persistence
//! - [`adapter`] - the navigation boundary and a directory-backed adapter
//! - [`context`] - immutable position during a walk
//! - [`crawler`] - recursive depth-first walk with drift detection
//! - [`download`] - trigger-then-poll download batches
//! - [`convert`] - post-download conversion to PDF
//! - [`driver`] - per-root sync loop, run summary and run lock
//! - [`wait`] - bounded wait policies
//! - [`config`] - TOML config file and roots file

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod adapter;
pub mod config;
pub mod context;
pub mod convert;
pub mod crawler;
pub mod download;
pub mod driver;
pub mod manifest;
pub mod wait;

// Re-export commonly used types
pub use adapter::{AdapterError, DirectoryAdapter, NavigationAdapter, RemoteEntry, RemoteListing};
pub use config::{ConfigError, FileConfig, Settings};
pub use context::TraversalContext;
pub use convert::{CommandConverter, ConversionDispatcher, ConvertError, Converter};
pub use crawler::{CrawlError, CrawlSettings, DriftEvent, TreeCrawler, WalkReport};
pub use download::{BatchOutcome, DownloadError, DownloadOrchestrator};
pub use driver::{
    RootOutcome, RootReport, RootSpec, RunLock, SyncDriver, SyncError, SyncSettings, SyncSummary,
};
pub use manifest::{Manifest, ManifestError, ManifestNode, ManifestStore};
pub use wait::{DownloadPolicy, WaitPolicy};
