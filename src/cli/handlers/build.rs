// src/cli/handlers/build.rs

//! Handler for `matlab-runner build`.

use crate::{
    CancellationToken,
    cli::args::{BuildArgs, GlobalArgs},
    cli::handlers::commons,
    core::actions::RunBuildAction,
};
use anyhow::Result;

/// Handler for `matlab-runner build`.
pub fn handle(
    global: &GlobalArgs,
    args: BuildArgs,
    cancellation_token: &CancellationToken,
) -> Result<()> {
    let (params, _) = commons::prepare(global, cancellation_token)?;
    let action = RunBuildAction::new(params, args.tasks, args.build_options);
    log::debug!("Running build action {}", action.action_id());
    action.run()?;
    Ok(())
}
