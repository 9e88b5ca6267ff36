// src/core/mod.rs

//! Runner logic: scratch folders, platform staging, scripts and actions.

pub mod actions;
pub mod environment;
pub mod error;
pub mod platform;
pub mod runner;
pub mod script;
pub mod workspace;

#[cfg(test)]
pub(crate) mod test_support;
