//! CLI entry point for docmirror.

use std::process::ExitCode;

mod app;
mod cli;
mod commands;
mod output;

/// How the process ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Finished, including runs where some roots or files were skipped.
    Success,
    Failure,
    /// Another sync holds the run lock.
    AlreadyRunning,
}

impl ProcessExit {
    fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::AlreadyRunning => 2,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let exit = match app::runtime::run_docmirror().await {
        Ok(exit) => exit,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ProcessExit::Failure
        }
    };
    ExitCode::from(exit.code())
}
