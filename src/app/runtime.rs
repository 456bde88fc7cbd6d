use anyhow::Result;
use clap::Parser;
use tracing::debug;

use crate::app::{config_runtime, terminal};
use crate::cli::{Cli, Command};
use crate::{ProcessExit, commands, output};

pub(crate) async fn run_docmirror() -> Result<ProcessExit> {
    // Parse before tracing so --help works without logs
    let cli = Cli::parse();

    let default_level = config_runtime::resolve_default_log_level(&cli);
    let force_cli_log_level = config_runtime::should_force_cli_log_level(&cli);
    let no_color = terminal::is_no_color_requested(cli.no_color);
    terminal::init_tracing(default_level, force_cli_log_level, no_color);

    debug!(?cli, "CLI arguments parsed");

    let Some(command) = &cli.command else {
        output::print_quick_start_guidance();
        return Ok(ProcessExit::Success);
    };

    let file_config = config_runtime::load_file_config(cli.config.as_deref())?;
    match command {
        Command::Sync(args) => commands::run_sync_command(args, file_config).await,
        Command::List(args) => {
            commands::run_list_command(args, file_config).await?;
            Ok(ProcessExit::Success)
        }
        Command::Roots(args) => {
            commands::run_roots_command(args, file_config)?;
            Ok(ProcessExit::Success)
        }
    }
}
