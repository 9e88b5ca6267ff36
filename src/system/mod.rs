//! # System Interaction Layer
//!
//! Abstractions over the operating system used by the MATLAB runner.
//!
//! ## Modules
//!
//! - **`executor`**: spawns external processes, waits for them while watching a
//!   cancellation token, and streams their output into a sink.
//! - **`output`**: the byte sinks MATLAB output and build log lines are written to.

pub mod executor;
pub mod output;
