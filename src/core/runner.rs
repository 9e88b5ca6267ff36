// src/core/runner.rs

//! The runner that prepares and executes one MATLAB command at a time.

use crate::{
    core::{
        environment::{ComposedEnvironment, EnvironmentComposer},
        error::RunnerError,
        platform::PlatformResolver,
        script,
        workspace::ScratchWorkspace,
    },
    models::{ExecutionResult, RunnerParameters, ScriptArtifact, StagedExecutable},
    system::{
        executor::{ExecutionError, Launcher, ProcessSpec},
        output::{self, OutputSink},
    },
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const OUTPUT_BANNER: &str =
    "\n#################### Starting command output ####################";

/// Lifecycle of a runner, as seen from the outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// Nothing has run yet.
    Idle,
    /// Resolving the platform, staging the launcher or writing the script.
    Staging,
    /// MATLAB is running.
    Running,
    /// The last run exited with code 0.
    Succeeded,
    /// The last run failed or could not start.
    Failed,
}

/// Runs MATLAB code through the bundled `run-matlab-command` launcher.
///
/// Each runner owns one scratch folder inside the caller's workspace. The launcher is
/// staged there on the first [`run`](Self::run) and reused afterwards; each run writes a
/// new script next to it. Call [`dispose`](Self::dispose) when done.
pub struct MatlabCommandRunner {
    workspace: PathBuf,
    resource_dir: PathBuf,
    startup_options: String,
    launcher: Launcher,
    resolver: PlatformResolver,
    environment: EnvironmentComposer,
    scratch: ScratchWorkspace,
    log: OutputSink,
    redirect: Option<OutputSink>,
    staged: Option<StagedExecutable>,
    state: RunnerState,
}

impl MatlabCommandRunner {
    /// Provisions the scratch folder. Nothing is staged until the first run.
    ///
    /// A relative workspace is resolved against the current directory, since MATLAB
    /// reads the working-folder marker from its own scratch folder.
    pub fn new(params: RunnerParameters) -> Result<Self, RunnerError> {
        let workspace = std::path::absolute(&params.workspace)
            .map(|path| dunce::simplified(&path).to_path_buf())
            .map_err(|source| RunnerError::WorkspaceUnavailable {
                path: params.workspace.clone(),
                source,
            })?;
        let scratch = ScratchWorkspace::provision(&workspace)?;
        let environment =
            EnvironmentComposer::new(params.env).with_matlab_root(params.matlab_root);

        Ok(Self {
            workspace,
            resource_dir: params.resource_dir,
            startup_options: params.startup_options,
            launcher: params.launcher,
            resolver: PlatformResolver::new(params.probe_command),
            environment,
            scratch,
            log: params.log,
            redirect: None,
            staged: None,
            state: RunnerState::Idle,
        })
    }

    /// Runs `command` as a MATLAB script and waits for it to finish.
    ///
    /// `$VAR` and `${VAR}` references are expanded against the composed environment before
    /// the script is written. A non-zero exit is reported as
    /// [`RunnerError::ExecutionFailed`] with MATLAB's exit code.
    pub fn run(&mut self, command: &str) -> Result<(), RunnerError> {
        self.state = RunnerState::Staging;
        let result = self.execute(command);
        self.state = match result {
            Ok(()) => RunnerState::Succeeded,
            Err(_) => RunnerState::Failed,
        };
        result
    }

    fn execute(&mut self, command: &str) -> Result<(), RunnerError> {
        let program = self.prepare_runner_executable()?.path.clone();

        let environment = self.composed_environment();
        if let Some(bin) = environment.matlab_bin() {
            self.log_line(&format!("Adding MATLAB to system path: {}", bin.display()));
        }
        let env = environment.to_map();

        let script = script::write_script(self.scratch.path(), command, &env, &mut *self.log)?;
        let spec = ProcessSpec {
            program,
            args: self.build_arguments(&script),
            cwd: self.workspace.clone(),
            env,
        };
        log::debug!("MATLAB command line: {}", spec.command_line());

        self.state = RunnerState::Running;
        output::write_line(&mut *self.log, OUTPUT_BANNER);

        let sink: &mut (dyn Write + Send) = match self.redirect.as_mut() {
            Some(redirect) => &mut **redirect,
            None => &mut *self.log,
        };
        let code = self.launcher.launch(&spec, sink).map_err(|e| match e {
            ExecutionError::Cancelled => RunnerError::Cancelled,
            source => RunnerError::SpawnFailed { source },
        })?;

        log::debug!("MATLAB exited with code {}", code);
        ExecutionResult::from_exit_code(code).into_result()
    }

    /// Stages the launcher for this host on first use and returns it.
    pub fn prepare_runner_executable(&mut self) -> Result<&StagedExecutable, RunnerError> {
        let staged = match self.staged.take() {
            Some(staged) => staged,
            None => {
                let platform = self.resolver.resolve(&self.launcher)?;
                let staged = PlatformResolver::stage(platform, &self.resource_dir, &self.scratch)?;
                log::debug!(
                    "Staged {} launcher at '{}'",
                    staged.platform,
                    staged.path.display()
                );
                staged
            }
        };
        Ok(self.staged.insert(staged))
    }

    /// Arguments passed to the launcher: the invocation expression followed by the
    /// startup options.
    pub fn build_arguments(&self, script: &ScriptArtifact) -> Vec<String> {
        std::iter::once(self.invocation_expression(script))
            .chain(self.startup_options.split_whitespace().map(str::to_string))
            .collect()
    }

    /// `cd('<scratch>');<script>`, so MATLAB finds the generated script.
    pub fn invocation_expression(&self, script: &ScriptArtifact) -> String {
        format!(
            "cd('{}');{}",
            quote_matlab(&self.scratch.path().to_string_lossy()),
            script.base_name
        )
    }

    /// Sends MATLAB's output to `sink` instead of the build log, for every later run.
    pub fn redirect_output(&mut self, sink: OutputSink) {
        self.redirect = Some(sink);
    }

    /// Adds a variable for every later run.
    pub fn add_environment_variable(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.environment.add_variable(key, value);
    }

    /// The environment the next run would start with.
    pub fn composed_environment(&self) -> ComposedEnvironment {
        self.environment.compose(&self.workspace)
    }

    /// The scratch folder owned by this runner.
    pub fn temp_folder(&self) -> &Path {
        self.scratch.path()
    }

    /// The caller's workspace, always absolute.
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Directory the launcher and other bundled files are copied from.
    pub fn resource_dir(&self) -> &Path {
        &self.resource_dir
    }

    /// Where the runner is in its lifecycle.
    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Copies a bundled file into the scratch folder under the relative path `target`.
    pub fn copy_file_to_temp_folder(
        &self,
        source: &Path,
        target: &str,
    ) -> Result<PathBuf, RunnerError> {
        self.scratch
            .copy_resource(source, target)
            .map_err(|e| RunnerError::ResourceCopyFailed {
                resource: source.to_path_buf(),
                source: e,
            })
    }

    /// Copies a bundled directory into the scratch folder.
    pub fn copy_tree_to_temp_folder(
        &self,
        source: &Path,
        target: &str,
    ) -> Result<PathBuf, RunnerError> {
        self.scratch
            .copy_resource_tree(source, target)
            .map_err(|e| RunnerError::ResourceCopyFailed {
                resource: source.to_path_buf(),
                source: e,
            })
    }

    /// Writes a line to the build log (never to the redirect target).
    pub fn log_line(&mut self, text: &str) {
        output::write_line(&mut *self.log, text);
    }

    /// Removes the scratch folder and everything staged in it.
    pub fn dispose(mut self) -> io::Result<()> {
        self.scratch.dispose()
    }
}

impl std::fmt::Debug for MatlabCommandRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatlabCommandRunner")
            .field("workspace", &self.workspace)
            .field("scratch", &self.scratch)
            .field("staged", &self.staged)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Doubles single quotes so `text` can sit inside a MATLAB char literal.
pub(crate) fn quote_matlab(text: &str) -> String {
    text.replace('\'', "''")
}
