// src/cli/handlers/mod.rs

//! One module per action, plus the setup they share.

pub mod build;
pub mod command;
pub mod commons;
pub mod test;
