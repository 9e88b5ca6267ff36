// src/cli/handlers/commons.rs

//! Turns command-line flags and the config file into action parameters.

use crate::{
    CancellationToken,
    cli::args::GlobalArgs,
    config::{self, RunnerConfig},
    core::actions::ActionParameters,
    models::RunnerParameters,
    system::executor::Launcher,
};
use anyhow::{Context, Result, anyhow};
use std::collections::HashMap;
use std::env;
use std::io;
use std::path::{Path, PathBuf};

/// Loads the config and builds the parameters every action starts from.
pub fn prepare(
    global: &GlobalArgs,
    cancellation_token: &CancellationToken,
) -> Result<(ActionParameters, RunnerConfig)> {
    let config = RunnerConfig::load(global.config.as_deref())?;

    let cwd = env::current_dir().context("Could not determine the current directory")?;
    let workspace = absolute(&cwd, global.workspace.clone().unwrap_or_else(|| cwd.clone()));

    let resource_dir = match &global.resource_dir {
        Some(dir) => Some(dir.clone()),
        None => config
            .resource_dir
            .as_deref()
            .map(config::expand_path)
            .transpose()?,
    }
    .or_else(config::default_resource_dir)
    .ok_or_else(|| anyhow!("No resource directory configured. Use --resource-dir."))?;

    let matlab_root = match &global.matlab_root {
        Some(root) => Some(root.clone()),
        None => config
            .matlab_root
            .as_deref()
            .map(config::expand_path)
            .transpose()?,
    };

    let artifact_dir = match &global.artifact_dir {
        Some(dir) => Some(dir.clone()),
        None => config
            .artifact_dir
            .as_deref()
            .map(config::expand_path)
            .transpose()?,
    }
    .map(|dir| absolute(&workspace, dir));

    let startup_options = global
        .startup_options
        .clone()
        .or_else(|| config.startup_options.clone())
        .unwrap_or_default();

    log::debug!(
        "Workspace '{}', resources '{}'",
        workspace.display(),
        resource_dir.display()
    );

    let runner = RunnerParameters::new(workspace, absolute(&cwd, resource_dir))
        .with_env(base_environment(&config, &global.env))
        .with_startup_options(startup_options)
        .with_matlab_root(matlab_root.map(|root| absolute(&cwd, root)))
        .with_launcher(Launcher::for_current_host(cancellation_token.clone()))
        .with_log(Box::new(io::stdout()));

    let params = ActionParameters::new(runner).with_artifact_dir(artifact_dir);
    Ok((params, config))
}

/// This process's environment, then the config's `[env]`, then `--env` flags.
pub fn base_environment(
    config: &RunnerConfig,
    overrides: &[(String, String)],
) -> HashMap<String, String> {
    let mut vars: HashMap<String, String> = env::vars().collect();
    vars.extend(config.env.iter().map(|(k, v)| (k.clone(), v.clone())));
    vars.extend(overrides.iter().cloned());
    vars
}

fn absolute(base: &Path, path: PathBuf) -> PathBuf {
    let path = if path.is_absolute() {
        path
    } else {
        base.join(path)
    };
    dunce::simplified(&path).to_path_buf()
}
