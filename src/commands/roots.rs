use anyhow::Result;
use docmirror_core::Settings;
use docmirror_core::config::FileConfig;

use crate::app::config_runtime;
use crate::cli::RootsArgs;
use crate::output;

pub(crate) fn run_roots_command(args: &RootsArgs, config: FileConfig) -> Result<()> {
    let config = config_runtime::apply_roots_overrides(config, args);
    let settings = Settings::from_file_config(&config)?;
    if settings.roots.is_empty() {
        println!("No roots configured.");
        return Ok(());
    }
    for line in output::root_lines(&settings.roots) {
        println!("{line}");
    }
    Ok(())
}
