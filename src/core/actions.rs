// src/core/actions.rs

//! The operations a user asks for: run a command, run the build tool, run tests.
//!
//! Every action owns one [`MatlabCommandRunner`] and disposes it when it returns, whether
//! MATLAB succeeded or not.

use crate::{
    constants::{
        ACTION_ID_VAR, BUILD_ARTIFACT, BUILD_REPORT_PLUGIN, DEFAULT_PLUGIN, DEFAULT_PLUGINS_FCN,
        PLUGINS_FCN_OVERRIDE_VAR, SCRIPT_GENERATOR_DIR, TASK_RUN_PROGRESS_PLUGIN,
        TEMP_FOLDER_VAR,
    },
    core::{
        error::RunnerError,
        runner::{MatlabCommandRunner, quote_matlab},
    },
    models::{RunnerParameters, TestOptions},
};
use scopeguard::ScopeGuard;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const ACTION_ID_LEN: usize = 8;
const BUILD_PLUGINS: [&str; 3] = [DEFAULT_PLUGIN, BUILD_REPORT_PLUGIN, TASK_RUN_PROGRESS_PLUGIN];

/// What every action needs.
#[derive(Debug)]
pub struct ActionParameters {
    /// Settings for the runner the action starts.
    pub runner: RunnerParameters,
    /// Where build artifacts end up once the scratch folder is gone.
    pub artifact_dir: PathBuf,
}

impl ActionParameters {
    /// Artifacts are collected in the workspace itself.
    pub fn new(runner: RunnerParameters) -> Self {
        let artifact_dir = runner.workspace.clone();
        Self {
            runner,
            artifact_dir,
        }
    }

    /// Overrides the artifact destination when `dir` is set.
    pub fn with_artifact_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.artifact_dir = dir;
        }
        self
    }
}

/// Runs arbitrary MATLAB code with the build plugins on the path.
#[derive(Debug)]
pub struct RunCommandAction {
    params: ActionParameters,
    command: String,
    action_id: String,
}

impl RunCommandAction {
    /// Assigns a fresh action id.
    pub fn new(params: ActionParameters, command: impl Into<String>) -> Self {
        Self {
            params,
            command: command.into(),
            action_id: new_action_id(),
        }
    }

    /// Id exported to the build plugins.
    pub fn action_id(&self) -> &str {
        &self.action_id
    }

    /// Runs the command and moves the build artifact to the artifact dir.
    pub fn run(self) -> Result<(), RunnerError> {
        let command = self.command;
        run_with_build_plugins(self.params, &self.action_id, |temp| {
            format!("addpath('{}');{}", quote_matlab(temp), command)
        })
    }
}

/// Runs `buildtool` with optional tasks and options.
#[derive(Debug)]
pub struct RunBuildAction {
    params: ActionParameters,
    tasks: Option<String>,
    build_options: Option<String>,
    action_id: String,
}

impl RunBuildAction {
    /// Assigns a fresh action id.
    pub fn new(
        params: ActionParameters,
        tasks: Option<String>,
        build_options: Option<String>,
    ) -> Self {
        Self {
            params,
            tasks,
            build_options,
            action_id: new_action_id(),
        }
    }

    /// Id exported to the build plugins.
    pub fn action_id(&self) -> &str {
        &self.action_id
    }

    /// Runs the build and moves the build artifact to the artifact dir.
    pub fn run(self) -> Result<(), RunnerError> {
        let (tasks, build_options) = (self.tasks, self.build_options);
        run_with_build_plugins(self.params, &self.action_id, |temp| {
            let mut command = format!("addpath('{}'); buildtool", quote_matlab(temp));
            for part in [tasks, build_options].into_iter().flatten() {
                command.push(' ');
                command.push_str(&part);
            }
            command
        })
    }
}

/// Generates a test runner script with `genscript` and runs it.
#[derive(Debug)]
pub struct RunTestsAction {
    params: ActionParameters,
    options: TestOptions,
}

impl RunTestsAction {
    /// Action for the given test options.
    pub fn new(params: ActionParameters, options: TestOptions) -> Self {
        Self { params, options }
    }

    /// Generates the test script in the scratch folder and runs it.
    pub fn run(self) -> Result<(), RunnerError> {
        let mut runner = start_runner(self.params.runner)?;

        let generator = runner.resource_dir().join(SCRIPT_GENERATOR_DIR);
        runner.copy_tree_to_temp_folder(&generator, "")?;

        let command = test_runner_script(runner.temp_folder(), &self.options);
        run_logged(&mut runner, &command)
    }
}

/// The `genscript` argument list for `options`, starting with `'Test'`.
///
/// Text values are quoted. `true` and cell arrays are passed as they are. Unset and
/// `false` options are left out, as are a `default` logging level and output detail.
pub fn genscript_arguments(options: &TestOptions) -> String {
    let text = |value: &Option<String>| value.clone();
    let level = |value: &Option<String>| {
        value
            .as_deref()
            .filter(|v| !v.eq_ignore_ascii_case("default"))
            .map(str::to_string)
    };
    let flag = |value: bool| value.then(|| "true".to_string());
    let folders = |list: &[String]| (!list.is_empty()).then(|| cell_array(list));

    let pairs = [
        ("PDFTestReport", text(&options.pdf_report)),
        ("TAPTestResults", text(&options.tap_results)),
        ("JUnitTestResults", text(&options.junit_results)),
        ("CoberturaCodeCoverage", text(&options.cobertura_code_coverage)),
        ("SimulinkTestResults", text(&options.simulink_test_results)),
        ("CoberturaModelCoverage", text(&options.cobertura_model_coverage)),
        ("SelectByTag", text(&options.select_by_tag)),
        ("UseParallel", flag(options.use_parallel)),
        ("Strict", flag(options.strict)),
        ("LoggingLevel", level(&options.logging_level)),
        ("OutputDetail", level(&options.output_detail)),
        ("SourceFolder", folders(&options.source_folders)),
        ("SelectByFolder", folders(&options.select_by_folders)),
    ];

    let mut args = vec![single_quote("Test")];
    for (name, value) in pairs {
        let Some(value) = value.filter(|v| v != "false") else {
            continue;
        };
        args.push(single_quote(name));
        if value == "true" || value.starts_with('{') {
            args.push(value);
        } else {
            args.push(single_quote(&value));
        }
    }
    args.join(",")
}

fn test_runner_script(temp: &Path, options: &TestOptions) -> String {
    [
        format!("addpath('{}');", quote_matlab(&temp.to_string_lossy())),
        format!("testScript = genscript({});", genscript_arguments(options)),
        "disp('Running MATLAB script with content:');".to_string(),
        "disp(testScript.Contents);".to_string(),
        "fprintf('___________________________________\\n\\n');".to_string(),
        "run(testScript);".to_string(),
    ]
    .join("\n")
}

fn single_quote(text: &str) -> String {
    format!("'{}'", quote_matlab(text))
}

fn cell_array(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| single_quote(item)).collect();
    format!("{{{}}}", quoted.join(","))
}

fn new_action_id() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(ACTION_ID_LEN)
        .collect()
}

type GuardedRunner = ScopeGuard<MatlabCommandRunner, fn(MatlabCommandRunner)>;

/// Creates a runner that is disposed when the guard goes out of scope.
fn start_runner(params: RunnerParameters) -> Result<GuardedRunner, RunnerError> {
    let runner = MatlabCommandRunner::new(params)?;
    Ok(scopeguard::guard(runner, dispose_runner as fn(MatlabCommandRunner)))
}

fn dispose_runner(runner: MatlabCommandRunner) {
    let temp = runner.temp_folder().to_path_buf();
    if let Err(e) = runner.dispose() {
        log::warn!(
            "Failed to remove scratch folder '{}': {}",
            temp.display(),
            e
        );
    }
}

fn run_with_build_plugins(
    params: ActionParameters,
    action_id: &str,
    command: impl FnOnce(&str) -> String,
) -> Result<(), RunnerError> {
    let mut runner = start_runner(params.runner)?;

    for plugin in BUILD_PLUGINS {
        let source = runner.resource_dir().join(plugin);
        runner.copy_file_to_temp_folder(&source, plugin)?;
    }

    let temp = runner.temp_folder().to_string_lossy().into_owned();
    runner.add_environment_variable(PLUGINS_FCN_OVERRIDE_VAR, DEFAULT_PLUGINS_FCN);
    runner.add_environment_variable(ACTION_ID_VAR, action_id);
    runner.add_environment_variable(TEMP_FOLDER_VAR, temp.as_str());

    let result = run_logged(&mut runner, &command(temp.as_str()));
    match move_build_artifact(runner.temp_folder(), &params.artifact_dir, action_id) {
        Ok(Some(path)) => log::debug!("Build artifact saved to '{}'", path.display()),
        Ok(None) => {}
        Err(e) => log::warn!("Could not collect build artifact: {}", e),
    }
    result
}

/// Runs `command`, echoing any error to the build log before returning it.
fn run_logged(runner: &mut MatlabCommandRunner, command: &str) -> Result<(), RunnerError> {
    runner.run(command).inspect_err(|e| runner.log_line(&e.to_string()))
}

/// Moves `buildArtifact.json` out of `temp` as `buildArtifact<id>.json`, if MATLAB wrote one.
fn move_build_artifact(
    temp: &Path,
    artifact_dir: &Path,
    action_id: &str,
) -> io::Result<Option<PathBuf>> {
    let source = temp.join(format!("{}.json", BUILD_ARTIFACT));
    if !source.is_file() {
        return Ok(None);
    }

    fs::create_dir_all(artifact_dir)?;
    let destination = artifact_dir.join(format!("{}{}.json", BUILD_ARTIFACT, action_id));
    if fs::rename(&source, &destination).is_err() {
        // Different file systems.
        fs::copy(&source, &destination)?;
        fs::remove_file(&source)?;
    }
    Ok(Some(destination))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_ids_are_short_and_distinct() {
        let a = new_action_id();
        let b = new_action_id();
        assert_eq!(a.len(), ACTION_ID_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_genscript_arguments_defaults() {
        assert_eq!(genscript_arguments(&TestOptions::default()), "'Test'");
    }

    #[test]
    fn test_genscript_arguments_quotes_text_values() {
        let options = TestOptions {
            junit_results: Some("results/junit.xml".to_string()),
            select_by_tag: Some("it's".to_string()),
            ..TestOptions::default()
        };
        assert_eq!(
            genscript_arguments(&options),
            "'Test','JUnitTestResults','results/junit.xml','SelectByTag','it''s'"
        );
    }

    #[test]
    fn test_genscript_arguments_flags_and_folders() {
        let options = TestOptions {
            use_parallel: true,
            strict: false,
            source_folders: vec!["src".to_string(), "lib".to_string()],
            ..TestOptions::default()
        };
        assert_eq!(
            genscript_arguments(&options),
            "'Test','UseParallel',true,'SourceFolder',{'src','lib'}"
        );
    }

    #[test]
    fn test_genscript_arguments_skip_default_levels() {
        let mut options = TestOptions {
            logging_level: Some("Default".to_string()),
            output_detail: Some("default".to_string()),
            ..TestOptions::default()
        };
        assert_eq!(genscript_arguments(&options), "'Test'");

        options.logging_level = Some("Detailed".to_string());
        options.output_detail = Some("false".to_string());
        assert_eq!(
            genscript_arguments(&options),
            "'Test','LoggingLevel','Detailed'"
        );
    }

    #[test]
    fn test_move_build_artifact() {
        let temp = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        let artifacts = target.path().join("artifacts");

        assert!(
            move_build_artifact(temp.path(), &artifacts, "abc12345")
                .unwrap()
                .is_none()
        );

        fs::write(temp.path().join("buildArtifact.json"), "{}").unwrap();
        let moved = move_build_artifact(temp.path(), &artifacts, "abc12345")
            .unwrap()
            .unwrap();
        assert_eq!(moved, artifacts.join("buildArtifactabc12345.json"));
        assert!(!temp.path().join("buildArtifact.json").exists());
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use crate::core::test_support::{Fixture, lines_with_prefix};
        use std::collections::HashMap;

        fn with_plugins(fixture: &Fixture) {
            for plugin in BUILD_PLUGINS {
                fixture.add_resource(plugin, "% plugin");
            }
        }

        #[test]
        fn test_command_action_stages_plugins_and_cleans_up() {
            let fixture = Fixture::new();
            with_plugins(&fixture);
            let params = ActionParameters::new(fixture.params());
            let action = RunCommandAction::new(params, "disp(1)");
            let action_id = action.action_id().to_string();

            action.run().unwrap();

            let log = fixture.log.contents();
            assert!(log.contains("addpath('"));
            assert!(log.contains("');disp(1)"));
            assert_eq!(lines_with_prefix(&log, "action="), [action_id]);
            assert_eq!(lines_with_prefix(&log, "plugins="), ["staged"]);
            assert!(!fixture.workspace().join(".matlab").exists());
        }

        #[test]
        fn test_command_action_without_plugins_fails_before_running() {
            let fixture = Fixture::new();
            let params = ActionParameters::new(fixture.params());
            let action = RunCommandAction::new(params, "disp(1)");

            let err = action.run().unwrap_err();

            assert!(matches!(err, RunnerError::ResourceCopyFailed { .. }));
            assert!(!fixture.log.contents().contains("Starting command output"));
            assert!(!fixture.workspace().join(".matlab").exists());
        }

        #[test]
        fn test_build_action_collects_artifact() {
            let fixture = Fixture::new();
            with_plugins(&fixture);
            let env = HashMap::from([(
                "FAKE_ARTIFACT".to_string(),
                "{\"tasks\":[]}".to_string(),
            )]);
            let artifacts = fixture.root().join("artifacts");
            let params = ActionParameters::new(fixture.params().with_env(env))
                .with_artifact_dir(Some(artifacts.clone()));
            let action = RunBuildAction::new(
                params,
                Some("test package".to_string()),
                Some("-continueOnFailure".to_string()),
            );
            let action_id = action.action_id().to_string();

            action.run().unwrap();

            let log = fixture.log.contents();
            assert!(log.contains("'); buildtool test package -continueOnFailure"));
            let artifact = artifacts.join(format!("buildArtifact{}.json", action_id));
            assert_eq!(fs::read_to_string(artifact).unwrap(), "{\"tasks\":[]}");
        }

        #[test]
        fn test_build_action_failure_is_logged_and_artifact_kept() {
            let fixture = Fixture::new();
            with_plugins(&fixture);
            let env = HashMap::from([
                ("FAKE_ARTIFACT".to_string(), "{}".to_string()),
                ("FAKE_EXIT_CODE".to_string(), "3".to_string()),
            ]);
            let params = ActionParameters::new(fixture.params().with_env(env));
            let action = RunBuildAction::new(params, None, None);
            let action_id = action.action_id().to_string();

            let err = action.run().unwrap_err();

            assert!(matches!(err, RunnerError::ExecutionFailed { code: 3 }));
            let log = fixture.log.contents();
            assert!(log.contains("'); buildtool\n"));
            assert!(log.contains("MATLAB exited with non-zero code: 3"));
            assert!(
                fixture
                    .workspace()
                    .join(format!("buildArtifact{}.json", action_id))
                    .is_file()
            );
        }

        #[test]
        fn test_tests_action_runs_generated_script() {
            let fixture = Fixture::new();
            fixture.add_resource("matlab-script-generator/+scriptgen/genscript.m", "% gen");
            let options = TestOptions {
                junit_results: Some("junit.xml".to_string()),
                ..TestOptions::default()
            };

            RunTestsAction::new(ActionParameters::new(fixture.params()), options)
                .run()
                .unwrap();

            let log = fixture.log.contents();
            assert!(log.contains(
                "testScript = genscript('Test','JUnitTestResults','junit.xml');"
            ));
            assert!(log.contains("run(testScript);"));
        }

        #[test]
        fn test_tests_action_needs_script_generator() {
            let fixture = Fixture::new();
            let params = ActionParameters::new(fixture.params());
            let err = RunTestsAction::new(params, TestOptions::default())
                .run()
                .unwrap_err();
            assert!(matches!(err, RunnerError::ResourceCopyFailed { .. }));
        }
    }
}
