// src/cli/handlers/test.rs

//! Handler for `matlab-runner test`.

use crate::{
    CancellationToken,
    cli::args::{GlobalArgs, TestArgs},
    cli::handlers::commons,
    core::actions::RunTestsAction,
};
use anyhow::Result;

/// Handler for `matlab-runner test`. Flags override the `[test]` table of the config.
pub fn handle(
    global: &GlobalArgs,
    args: TestArgs,
    cancellation_token: &CancellationToken,
) -> Result<()> {
    let (params, config) = commons::prepare(global, cancellation_token)?;
    let options = args.apply_to(config.test);
    log::debug!("Test options: {:?}", options);
    RunTestsAction::new(params, options).run()?;
    Ok(())
}
