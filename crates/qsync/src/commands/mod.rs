//! Command dispatch: bridges CLI args -> core calls -> output formatting.

pub mod components;
pub mod select;
pub mod set;
pub mod util;
pub mod view;

use qsync_core::{Controller, ViewConfig};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a core-bound command to the appropriate handler.
///
/// `view` carries the resolved configuration for `Command::View`.
pub async fn dispatch(
    cmd: Command,
    view: Option<ViewConfig>,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Components(args) => components::handle(controller, args, global).await,
        Command::View(args) => {
            let config = view.ok_or_else(|| CliError::NotFound {
                resource_type: "view".into(),
                identifier: args.name.clone(),
                list_command: "view --help".into(),
            })?;
            view::handle(controller, config, args, global).await
        }
        Command::Select(args) => select::handle(controller, args, global).await,
        Command::Set(args) => set::handle(controller, args, global).await,
        // Completions are handled before dispatch
        Command::Completions(_) => unreachable!(),
    }
}
