// src/config.rs

//! The optional `config.toml` with per-user defaults.
//!
//! Every field can also be given on the command line, which takes precedence.

use crate::{
    constants::{CONFIG_DIR_NAME, CONFIG_FILENAME, RESOURCES_DIR_NAME, RESOURCES_ENV_VAR},
    models::TestOptions,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures while loading the config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Could not read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML or has unknown keys.
    #[error("Failed to parse TOML file at '{}': {source}", path.display())]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// A `~` or `$VAR` in a path could not be expanded.
    #[error("Could not expand path '{path}': {message}")]
    PathExpansion { path: String, message: String },
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    /// Directory holding the bundled launchers, plugins and script generator.
    pub resource_dir: Option<String>,
    /// Default launcher flags.
    pub startup_options: Option<String>,
    /// MATLAB installation whose `bin` goes on `PATH`.
    pub matlab_root: Option<String>,
    /// Default destination for build artifacts.
    pub artifact_dir: Option<String>,
    /// Extra variables for every MATLAB process.
    pub env: HashMap<String, String>,
    /// Defaults for `matlab-runner test`.
    pub test: TestOptions,
}

impl RunnerConfig {
    /// Loads `path`, or the per-user file when `path` is `None`.
    ///
    /// An explicit path must exist. The per-user file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_path() {
                Some(path) if path.is_file() => path,
                _ => {
                    log::debug!("No config file found, using defaults.");
                    return Ok(Self::default());
                }
            },
        };

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::parse(&content).map_err(|source| ConfigError::TomlParse {
            path: path.clone(),
            source,
        })?;
        log::debug!("Loaded config from '{}'", path.display());
        Ok(config)
    }

    /// Parses config text without touching the filesystem.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// `<config dir>/matlab-runner/config.toml`, if the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILENAME))
}

/// Expands `~` and environment variables in a configured path.
pub fn expand_path(path: &str) -> Result<PathBuf, ConfigError> {
    let expanded = shellexpand::full(path).map_err(|e| ConfigError::PathExpansion {
        path: path.to_string(),
        message: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}

/// `$MATLAB_RUNNER_RESOURCES`, else `resources/` next to the running executable.
pub fn default_resource_dir() -> Option<PathBuf> {
    if let Some(dir) = env::var_os(RESOURCES_ENV_VAR).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    let exe = env::current_exe().ok()?;
    let dir = dunce::canonicalize(exe).ok()?.parent()?.join(RESOURCES_DIR_NAME);
    Some(dir)
}
