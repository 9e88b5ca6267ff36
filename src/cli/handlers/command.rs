// src/cli/handlers/command.rs

//! Handler for `matlab-runner command`.

use crate::{
    CancellationToken,
    cli::args::{CommandArgs, GlobalArgs},
    cli::handlers::commons,
    core::actions::RunCommandAction,
};
use anyhow::Result;

/// Handler for `matlab-runner command <code>`.
pub fn handle(
    global: &GlobalArgs,
    args: CommandArgs,
    cancellation_token: &CancellationToken,
) -> Result<()> {
    let (params, _) = commons::prepare(global, cancellation_token)?;
    let action = RunCommandAction::new(params, args.command_line());
    log::debug!("Running command action {}", action.action_id());
    action.run()?;
    Ok(())
}
