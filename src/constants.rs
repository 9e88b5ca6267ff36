// src/constants.rs

//! Names, paths and variables shared across the crate.

/// Folder created inside the caller's workspace that holds every scratch folder.
pub const SCRATCH_ROOT_DIR: &str = ".matlab";

/// Prefix of each scratch folder created under [`SCRATCH_ROOT_DIR`].
pub const SCRATCH_DIR_PREFIX: &str = "matlab";

/// Reserved environment variable holding the directory MATLAB must return to.
pub const ORIG_WORKING_FOLDER_VAR: &str = "MW_ORIG_WORKING_FOLDER";

/// Prefix and extension of generated script files.
pub const SCRIPT_FILE_PREFIX: &str = "script_";
/// Extension of generated script files.
pub const SCRIPT_FILE_EXTENSION: &str = ".m";

/// Length of the random part of a generated script name.
pub const SCRIPT_NAME_RANDOM_LEN: usize = 8;

/// Default command used to probe kernel and architecture on Unix-like hosts.
pub const PLATFORM_PROBE_COMMAND: &[&str] = &["uname", "-s", "-m"];

/// Environment variable that may point at the bundled resources directory.
pub const RESOURCES_ENV_VAR: &str = "MATLAB_RUNNER_RESOURCES";

/// Name of the resources directory looked up next to the executable.
pub const RESOURCES_DIR_NAME: &str = "resources";

// --- Build tool plugins ---

/// Plugin files staged into the scratch folder for the build tool.
pub const DEFAULT_PLUGIN: &str = "+ciplugins/+runner/getDefaultPlugins.m";
/// Writes the build artifact JSON.
pub const BUILD_REPORT_PLUGIN: &str = "+ciplugins/+runner/BuildReportPlugin.m";
/// Reports task progress.
pub const TASK_RUN_PROGRESS_PLUGIN: &str = "+ciplugins/+runner/TaskRunProgressPlugin.m";

/// Function MATLAB's build tool calls instead of its default plugin list.
pub const DEFAULT_PLUGINS_FCN: &str = "ciplugins.runner.getDefaultPlugins";

/// Tells the build tool to call [`DEFAULT_PLUGINS_FCN`].
pub const PLUGINS_FCN_OVERRIDE_VAR: &str = "MW_MATLAB_BUILDTOOL_DEFAULT_PLUGINS_FCN_OVERRIDE";
/// Identifier of the current action, read by the plugins.
pub const ACTION_ID_VAR: &str = "MW_BUILD_PLUGIN_ACTION_ID";
/// Scratch folder path, read by the plugins.
pub const TEMP_FOLDER_VAR: &str = "MW_MATLAB_TEMP_FOLDER";

/// Base name of the JSON artifact written by the build report plugin.
pub const BUILD_ARTIFACT: &str = "buildArtifact";

/// Resource tree containing the `genscript` test script generator.
pub const SCRIPT_GENERATOR_DIR: &str = "matlab-script-generator";

/// Name of the per-user config file (inside the `matlab-runner` config directory).
pub const CONFIG_FILENAME: &str = "config.toml";
/// Directory under the user config directory.
pub const CONFIG_DIR_NAME: &str = "matlab-runner";
