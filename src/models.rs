// src/models.rs

//! Data passed between the runner's components.

use crate::{
    constants::PLATFORM_PROBE_COMMAND,
    core::error::RunnerError,
    system::{executor::Launcher, output::OutputSink},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

// --- PLATFORM MODELS ---

/// Kind of host the launcher starts processes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    /// Linux, macOS and other Unix-like systems.
    Unix,
    /// Windows.
    Windows,
}

impl HostKind {
    /// The kind of the machine this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            HostKind::Windows
        } else {
            HostKind::Unix
        }
    }
}

/// One of the launcher variants shipped in the resources directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// `glnxa64`
    LinuxX64,
    /// `glnxarm64`
    LinuxArm64,
    /// `maci64`
    MacX64,
    /// `maca64`
    MacArm64,
    /// `win64`
    WindowsX64,
}

impl Platform {
    /// Every variant, in no particular order.
    pub const ALL: [Platform; 5] = [
        Platform::LinuxX64,
        Platform::LinuxArm64,
        Platform::MacX64,
        Platform::MacArm64,
        Platform::WindowsX64,
    ];

    /// Short name used in logs, e.g. `linux-x64`.
    pub fn tag(self) -> &'static str {
        match self {
            Platform::LinuxX64 => "linux-x64",
            Platform::LinuxArm64 => "linux-arm64",
            Platform::MacX64 => "mac-x64",
            Platform::MacArm64 => "mac-arm64",
            Platform::WindowsX64 => "windows-x64",
        }
    }

    /// Location of the bundled launcher, relative to the resources directory.
    pub fn resource_path(self) -> &'static str {
        match self {
            Platform::LinuxX64 => "glnxa64/run-matlab-command",
            Platform::LinuxArm64 => "glnxarm64/run-matlab-command",
            Platform::MacX64 => "maci64/run-matlab-command",
            Platform::MacArm64 => "maca64/run-matlab-command",
            Platform::WindowsX64 => "win64/run-matlab-command.exe",
        }
    }

    /// File name of the launcher once staged into the scratch folder.
    pub fn executable_name(self) -> &'static str {
        match self {
            Platform::WindowsX64 => "run-matlab-command.exe",
            _ => "run-matlab-command",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A launcher copied into the scratch folder and ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedExecutable {
    /// Variant that was staged.
    pub platform: Platform,
    /// Location inside the scratch folder.
    pub path: PathBuf,
    /// Whether the execute permission was set.
    pub executable: bool,
}

// --- SCRIPT & RESULT MODELS ---

/// A generated `.m` file. Written once and never touched again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptArtifact {
    /// Location inside the scratch folder.
    pub path: PathBuf,
    /// File name without extension; this is what MATLAB is asked to run.
    pub base_name: String,
    /// Content as the caller supplied it.
    pub raw_content: String,
    /// Content after variable expansion, without the preamble.
    pub expanded_content: String,
}

/// Outcome of one MATLAB process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Exit code 0.
    Success,
    /// Any other exit code.
    Failure(i32),
}

impl ExecutionResult {
    /// Classifies a process exit code.
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            ExecutionResult::Success
        } else {
            ExecutionResult::Failure(code)
        }
    }

    /// `Failure(code)` becomes [`RunnerError::ExecutionFailed`].
    pub fn into_result(self) -> Result<(), RunnerError> {
        match self {
            ExecutionResult::Success => Ok(()),
            ExecutionResult::Failure(code) => Err(RunnerError::ExecutionFailed { code }),
        }
    }
}

// --- TEST RUN OPTIONS ---

/// Name/value options forwarded to `genscript('Test', ...)`.
///
/// Absent values are not passed. Paths are interpreted by MATLAB relative to the workspace.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TestOptions {
    /// PDF test report.
    pub pdf_report: Option<String>,
    /// TAP results file.
    pub tap_results: Option<String>,
    /// JUnit XML results file.
    pub junit_results: Option<String>,
    /// Cobertura code coverage report.
    pub cobertura_code_coverage: Option<String>,
    /// Simulink Test results file.
    pub simulink_test_results: Option<String>,
    /// Cobertura model coverage report.
    pub cobertura_model_coverage: Option<String>,
    /// Only run tests with this tag.
    pub select_by_tag: Option<String>,
    /// `default` is the same as not setting it.
    pub logging_level: Option<String>,
    /// `default` is the same as not setting it.
    pub output_detail: Option<String>,
    /// Run tests in parallel.
    pub use_parallel: bool,
    /// Treat warnings as failures.
    pub strict: bool,
    /// Folders holding the code under test.
    pub source_folders: Vec<String>,
    /// Only run tests in these folders.
    pub select_by_folders: Vec<String>,
}

// --- PARAMETER BUNDLE ---

/// Everything a [`MatlabCommandRunner`](crate::core::runner::MatlabCommandRunner) needs
/// from its caller.
pub struct RunnerParameters {
    /// The caller's workspace. MATLAB runs with this as its working directory.
    pub workspace: PathBuf,
    /// Directory holding the bundled launchers and plugins.
    pub resource_dir: PathBuf,
    /// Environment snapshot the child process starts from.
    pub env: HashMap<String, String>,
    /// Extra launcher flags, split on whitespace.
    pub startup_options: String,
    /// Installation whose `bin` folder is put in front of `PATH`.
    pub matlab_root: Option<PathBuf>,
    /// Command run on Unix hosts to find out kernel and architecture.
    pub probe_command: Vec<String>,
    /// Starts processes; carries the cancellation token.
    pub launcher: Launcher,
    /// Build log. Receives MATLAB output unless it is redirected.
    pub log: OutputSink,
}

impl RunnerParameters {
    /// Parameters with an empty environment, no startup options and output to stdout.
    pub fn new(workspace: impl Into<PathBuf>, resource_dir: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            resource_dir: resource_dir.into(),
            env: HashMap::new(),
            startup_options: String::new(),
            matlab_root: None,
            probe_command: PLATFORM_PROBE_COMMAND
                .iter()
                .map(|s| s.to_string())
                .collect(),
            launcher: Launcher::for_current_host(Default::default()),
            log: Box::new(io::stdout()),
        }
    }

    /// Replaces the environment snapshot.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Sets the launcher flags.
    pub fn with_startup_options(mut self, options: impl Into<String>) -> Self {
        self.startup_options = options.into();
        self
    }

    /// Sets or clears the MATLAB installation.
    pub fn with_matlab_root(mut self, root: Option<PathBuf>) -> Self {
        self.matlab_root = root;
        self
    }

    /// Replaces the platform detection command.
    pub fn with_probe_command(mut self, command: Vec<String>) -> Self {
        self.probe_command = command;
        self
    }

    /// Replaces the launcher.
    pub fn with_launcher(mut self, launcher: Launcher) -> Self {
        self.launcher = launcher;
        self
    }

    /// Replaces the build log sink.
    pub fn with_log(mut self, log: OutputSink) -> Self {
        self.log = log;
        self
    }

    /// The caller's workspace.
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }
}

impl fmt::Debug for RunnerParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerParameters")
            .field("workspace", &self.workspace)
            .field("resource_dir", &self.resource_dir)
            .field("env", &format_args!("{} variables", self.env.len()))
            .field("startup_options", &self.startup_options)
            .field("matlab_root", &self.matlab_root)
            .field("probe_command", &self.probe_command)
            .field("launcher", &self.launcher)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_result_from_exit_code() {
        assert_eq!(ExecutionResult::from_exit_code(0), ExecutionResult::Success);
        assert_eq!(ExecutionResult::from_exit_code(12), ExecutionResult::Failure(12));
        assert_eq!(ExecutionResult::from_exit_code(-1), ExecutionResult::Failure(-1));
    }

    #[test]
    fn test_failure_keeps_exit_code() {
        let err = ExecutionResult::Failure(3).into_result().unwrap_err();
        assert!(matches!(err, RunnerError::ExecutionFailed { code: 3 }));
        assert!(ExecutionResult::Success.into_result().is_ok());
    }

    #[test]
    fn test_platform_resources_are_distinct() {
        let mut paths: Vec<_> = Platform::ALL.iter().map(|p| p.resource_path()).collect();
        paths.sort_unstable();
        paths.dedup();
        assert_eq!(paths.len(), Platform::ALL.len());
        assert_eq!(Platform::WindowsX64.executable_name(), "run-matlab-command.exe");
        assert_eq!(Platform::MacArm64.to_string(), "mac-arm64");
    }

    #[test]
    fn test_parameters_default_to_uname_probe() {
        let params = RunnerParameters::new("/ws", "/res");
        assert_eq!(params.probe_command, vec!["uname", "-s", "-m"]);
        assert!(params.startup_options.is_empty());
        assert_eq!(params.workspace(), Path::new("/ws"));
    }

    #[test]
    fn test_test_options_from_toml() {
        let options: TestOptions = toml::from_str(
            r#"
            junit_results = "results/junit.xml"
            strict = true
            source_folders = ["src", "lib"]
            "#,
        )
        .unwrap();
        assert_eq!(options.junit_results.as_deref(), Some("results/junit.xml"));
        assert!(options.strict);
        assert!(!options.use_parallel);
        assert_eq!(options.source_folders, vec!["src", "lib"]);
    }
}
