use std::time::Duration;

use anyhow::{Context, Result};
use docmirror_core::config::FileConfig;
use docmirror_core::driver::{LockError, RunLock, SyncDriver};
use docmirror_core::manifest::ManifestStore;
use docmirror_core::{DirectoryAdapter, NavigationAdapter, Settings};
use tracing::{info, warn};

use crate::ProcessExit;
use crate::app::config_runtime;
use crate::cli::SyncArgs;
use crate::output;

pub(crate) async fn run_sync_command(args: &SyncArgs, config: FileConfig) -> Result<ProcessExit> {
    let config = config_runtime::apply_sync_overrides(config, args);
    let settings = Settings::from_file_config(&config)?;

    let _lock = match RunLock::acquire(&settings.lock_path) {
        Ok(lock) => lock,
        Err(LockError::AlreadyRunning { path }) => {
            warn!(lock = %path.display(), "another sync is already running");
            eprintln!("Another docmirror sync is already running.");
            return Ok(ProcessExit::AlreadyRunning);
        }
        Err(error) => return Err(error.into()),
    };

    let mut driver = SyncDriver::new(
        DirectoryAdapter::new(),
        ManifestStore::new(&settings.manifest_path),
        settings.sync_settings(),
    )
    .with_orchestrator(settings.orchestrator())
    .with_dispatcher(settings.dispatcher());

    info!(
        roots = settings.roots.len(),
        target = %settings.target_dir.display(),
        manifest = %settings.manifest_path.display(),
        "starting sync"
    );

    let Some(minutes) = args.watch else {
        run_pass(&mut driver, &settings).await?;
        return Ok(ProcessExit::Success);
    };

    let interval = Duration::from_secs(minutes * 60);
    loop {
        run_pass(&mut driver, &settings).await?;
        info!(minutes, "waiting for next sync; press Ctrl-C to stop");
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("interrupted, stopping watch");
                return Ok(ProcessExit::Success);
            }
            () = tokio::time::sleep(interval) => {}
        }
    }
}

async fn run_pass<A: NavigationAdapter>(
    driver: &mut SyncDriver<A>,
    settings: &Settings,
) -> Result<()> {
    let summary = driver
        .sync_all(&settings.roots)
        .await
        .context("Sync failed")?;
    output::print_sync_summary(&summary);
    Ok(())
}
