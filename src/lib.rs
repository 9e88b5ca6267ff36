//! # matlab-runner
//!
//! Drives a MATLAB installation from a build host. Every invocation goes through a
//! [`core::runner::MatlabCommandRunner`], which stages the platform launcher
//! (`run-matlab-command`) into a private scratch folder, writes the caller's code to a
//! generated script and runs it with a composed environment.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Shared flag checked while a child process is running. Setting it kills the child.
pub type CancellationToken = Arc<AtomicBool>;

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod models;
pub mod system;
