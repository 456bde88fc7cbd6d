//! Config file loading and command-line overrides.

use std::path::Path;

use anyhow::{Context, Result, bail};
use docmirror_core::config::{FileConfig, resolve_default_config_path};
use tracing::debug;

use crate::cli::{Cli, LocationArgs, RootsArgs, SyncArgs};

pub(crate) fn resolve_default_log_level(cli: &Cli) -> &'static str {
    if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// A verbosity flag on the command line wins over `RUST_LOG`.
pub(crate) fn should_force_cli_log_level(cli: &Cli) -> bool {
    cli.verbose > 0 || cli.quiet
}

/// Loads `--config` if given (it must exist), else the default path if present.
pub(crate) fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            bail!("Config file '{}' does not exist", path.display());
        }
        return read_config(path);
    }

    match resolve_default_config_path() {
        Some(path) if path.exists() => read_config(&path),
        _ => {
            debug!("no config file found, using defaults");
            Ok(FileConfig::default())
        }
    }
}

fn read_config(path: &Path) -> Result<FileConfig> {
    let config = FileConfig::load(path)
        .with_context(|| format!("Failed to load config file '{}'", path.display()))?;
    debug!(path = %path.display(), "config file loaded");
    Ok(config)
}

pub(crate) fn apply_location_overrides(mut config: FileConfig, location: &LocationArgs) -> FileConfig {
    if let Some(target_dir) = &location.target_dir {
        config.target_dir = Some(target_dir.clone());
    }
    if let Some(manifest) = &location.manifest {
        config.manifest_path = Some(manifest.clone());
    }
    config
}

pub(crate) fn apply_sync_overrides(config: FileConfig, args: &SyncArgs) -> FileConfig {
    let mut config = apply_location_overrides(config, &args.location);
    if let Some(only) = &args.only {
        config.priority_root = Some(only.clone());
    }
    if let Some(roots_file) = &args.roots_file {
        config.roots_file = Some(roots_file.clone());
    }
    if let Some(batch_timeout) = args.batch_timeout {
        config.batch_timeout_secs = Some(batch_timeout);
    }
    if let Some(poll_interval) = args.poll_interval {
        config.poll_interval_ms = Some(poll_interval);
    }
    if let Some(max_depth) = args.max_depth {
        config.max_depth = Some(max_depth);
    }
    config
}

pub(crate) fn apply_roots_overrides(mut config: FileConfig, args: &RootsArgs) -> FileConfig {
    if let Some(roots_file) = &args.roots_file {
        config.roots_file = Some(roots_file.clone());
    }
    config
}
