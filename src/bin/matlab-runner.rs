// src/bin/matlab-runner.rs

//! Command-line entry point.

use anyhow::Result;
use clap::Parser;
use colored::*;
use matlab_runner::{
    CancellationToken,
    cli::{Action, Cli, handlers},
    core::error::RunnerError,
};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Exit code for a run interrupted with Ctrl+C.
const EXIT_CANCELLED: i32 = 130;

/// Sets up logging and Ctrl+C handling, runs the action and maps errors to exit codes.
fn main() {
    env_logger::init();

    let cancellation_token: CancellationToken = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        if let Err(e) = signal_hook::flag::register(signal, cancellation_token.clone()) {
            log::warn!("Could not install handler for signal {}: {}", signal, e);
        }
    }

    if let Err(e) = run_cli(Cli::parse(), &cancellation_token) {
        // --- Centralized Error Handling ---
        match e.downcast_ref::<RunnerError>() {
            Some(RunnerError::Cancelled) => std::process::exit(EXIT_CANCELLED),
            Some(RunnerError::ExecutionFailed { code }) => {
                // MATLAB has already reported the failure in its own output.
                std::process::exit(*code);
            }
            _ => {
                eprintln!("\n{}: {:#}", "Error".red().bold(), e);
                std::process::exit(1);
            }
        }
    }
}

fn run_cli(cli: Cli, cancellation_token: &CancellationToken) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    match cli.action {
        Action::Command(args) => handlers::command::handle(&cli.global, args, cancellation_token),
        Action::Build(args) => handlers::build::handle(&cli.global, args, cancellation_token),
        Action::Test(args) => handlers::test::handle(&cli.global, args, cancellation_token),
    }
}
