//! Subcommand handlers.

mod list;
mod roots;
mod sync;

pub(crate) use list::run_list_command;
pub(crate) use roots::run_roots_command;
pub(crate) use sync::run_sync_command;
