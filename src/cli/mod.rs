// src/cli/mod.rs

//! Command-line interface definition and dispatch.

use clap::{Parser, Subcommand};

pub mod args;
pub mod handlers;

use args::{BuildArgs, CommandArgs, GlobalArgs, TestArgs};

/// matlab-runner: run MATLAB code, builds and tests from the command line.
///
/// Each invocation stages the platform's `run-matlab-command` launcher into a scratch
/// folder under `<workspace>/.matlab`, runs MATLAB in the workspace and exits with
/// MATLAB's exit code.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = None,
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Flags accepted by every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// What to run.
    #[command(subcommand)]
    pub action: Action,
}

/// The available subcommands.
#[derive(Subcommand, Debug)]
pub enum Action {
    /// Run MATLAB code.
    #[command(alias = "cmd")]
    Command(CommandArgs),
    /// Run the MATLAB build tool.
    Build(BuildArgs),
    /// Run the project's tests.
    Test(TestArgs),
}
