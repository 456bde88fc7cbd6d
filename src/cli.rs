//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use docmirror_core::manifest::SortKey;

/// Incrementally mirror a remote document tree to local storage.
///
/// Docmirror walks each configured root, downloads files it has not seen
/// before and records them in a manifest so later runs only fetch new files.
#[derive(Parser, Debug)]
#[command(name = "docmirror")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored log output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Config file (default: $XDG_CONFIG_HOME/docmirror/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sync every configured root (or one with --only)
    Sync(SyncArgs),
    /// List synced files from the manifest
    List(ListArgs),
    /// Print the configured roots
    Roots(RootsArgs),
}

/// Paths shared by commands that read the manifest.
#[derive(Args, Debug, Default, Clone)]
pub struct LocationArgs {
    /// Local directory mirroring the roots
    #[arg(short = 't', long, value_name = "DIR")]
    pub target_dir: Option<PathBuf>,

    /// Manifest file (default: <target-dir>/.docmirror/manifest.json)
    #[arg(short = 'm', long, value_name = "PATH")]
    pub manifest: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    #[command(flatten)]
    pub location: LocationArgs,

    /// Sync only the root with this label
    #[arg(long, value_name = "LABEL")]
    pub only: Option<String>,

    /// JSON file mapping root labels to entry URLs
    #[arg(long, value_name = "PATH")]
    pub roots_file: Option<PathBuf>,

    /// Seconds to wait for one folder's downloads (1-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub batch_timeout: Option<u64>,

    /// Milliseconds between download checks (10-60000)
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(10..=60000))]
    pub poll_interval: Option<u64>,

    /// Deepest folder level to enter below each root
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Repeat the sync every N minutes until interrupted (1-1440)
    #[arg(long, value_name = "MINUTES", value_parser = clap::value_parser!(u64).range(1..=1440))]
    pub watch: Option<u64>,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    #[command(flatten)]
    pub location: LocationArgs,

    /// Show only files of this root
    #[arg(long, value_name = "LABEL")]
    pub root: Option<String>,

    /// Filter by name, root or folder (case-insensitive, fuzzy on names)
    #[arg(short, long, value_name = "TERM")]
    pub search: Option<String>,

    /// Sort column
    #[arg(long, value_enum, default_value_t = SortArg::Date)]
    pub sort: SortArg,

    /// Reverse the sort order
    #[arg(short, long)]
    pub reverse: bool,

    /// Print rows as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Default)]
pub struct RootsArgs {
    /// JSON file mapping root labels to entry URLs
    #[arg(long, value_name = "PATH")]
    pub roots_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Name,
    Root,
    Folder,
    #[default]
    Date,
}

impl From<SortArg> for SortKey {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Name => Self::Name,
            SortArg::Root => Self::Root,
            SortArg::Folder => Self::Folder,
            SortArg::Date => Self::Date,
        }
    }
}
