use anyhow::{Context, Result};
use docmirror_core::Settings;
use docmirror_core::config::FileConfig;
use docmirror_core::manifest::{EntryQuery, ManifestStore};

use crate::app::config_runtime;
use crate::cli::ListArgs;
use crate::output;

pub(crate) async fn run_list_command(args: &ListArgs, config: FileConfig) -> Result<()> {
    let config = config_runtime::apply_location_overrides(config, &args.location);
    let settings = Settings::from_file_config(&config)?;
    let store = ManifestStore::new(&settings.manifest_path);
    let manifest = store
        .load()
        .await
        .with_context(|| format!("Failed to read manifest '{}'", store.path().display()))?;

    let query = EntryQuery {
        root: args.root.clone(),
        search: args.search.clone(),
        sort: args.sort.into(),
        reverse: args.reverse,
    };
    let rows = query.apply(manifest.entries());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("No synced files match.");
        return Ok(());
    }
    for line in output::entry_lines(&rows, output::terminal_width()) {
        println!("{line}");
    }
    if let Some(last_sync) = manifest.last_sync_time() {
        println!("Last sync: {last_sync}");
    }
    Ok(())
}
