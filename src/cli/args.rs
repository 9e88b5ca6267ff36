// src/cli/args.rs

//! Flag groups shared by the subcommands.

use crate::models::TestOptions;
use clap::Args;
use std::path::PathBuf;

/// Options shared by every action.
#[derive(Args, Debug, Default, Clone)]
pub struct GlobalArgs {
    /// Config file to use instead of the per-user `config.toml`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory MATLAB runs in. Defaults to the current directory.
    #[arg(long, short = 'w', global = true)]
    pub workspace: Option<PathBuf>,

    /// Extra options for the MATLAB launcher, e.g. "-nojvm -logfile build.log".
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub startup_options: Option<String>,

    /// Sets a variable for the MATLAB process. Repeatable.
    #[arg(long = "env", short = 'e', global = true, value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Directory holding the bundled launchers and plugins.
    #[arg(long, global = true)]
    pub resource_dir: Option<PathBuf>,

    /// MATLAB installation to put on PATH.
    #[arg(long, global = true)]
    pub matlab_root: Option<PathBuf>,

    /// Where build artifacts are collected. Defaults to the workspace.
    #[arg(long, global = true)]
    pub artifact_dir: Option<PathBuf>,
}

/// Arguments of `matlab-runner command`.
#[derive(Args, Debug, Clone)]
pub struct CommandArgs {
    /// MATLAB code to run. `$VAR` and `${VAR}` are expanded first.
    #[arg(required = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl CommandArgs {
    /// Words of the command joined back with spaces.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

/// Arguments of `matlab-runner build`.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Tasks to run, e.g. "test package". Defaults to the build file's default tasks.
    #[arg(long)]
    pub tasks: Option<String>,

    /// Options passed to `buildtool`, e.g. "-continueOnFailure".
    #[arg(long, allow_hyphen_values = true)]
    pub build_options: Option<String>,
}

/// Test options. Anything given here replaces the value from the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct TestArgs {
    /// Write a PDF test report.
    #[arg(long, value_name = "FILE")]
    pub pdf_report: Option<String>,
    /// Write TAP results.
    #[arg(long, value_name = "FILE")]
    pub tap_results: Option<String>,
    /// Write JUnit XML results.
    #[arg(long, value_name = "FILE")]
    pub junit_results: Option<String>,
    /// Write a Cobertura code coverage report.
    #[arg(long, value_name = "FILE")]
    pub cobertura_code_coverage: Option<String>,
    /// Write Simulink Test results.
    #[arg(long, value_name = "FILE")]
    pub simulink_test_results: Option<String>,
    /// Write a Cobertura model coverage report.
    #[arg(long, value_name = "FILE")]
    pub cobertura_model_coverage: Option<String>,
    /// Only run tests carrying this tag.
    #[arg(long, value_name = "TAG")]
    pub select_by_tag: Option<String>,
    /// Run tests in parallel.
    #[arg(long)]
    pub use_parallel: bool,
    /// Treat warnings as failures.
    #[arg(long)]
    pub strict: bool,
    /// Verbosity of test logging, e.g. "Detailed".
    #[arg(long, value_name = "LEVEL")]
    pub logging_level: Option<String>,
    /// Amount of test output shown, e.g. "Concise".
    #[arg(long, value_name = "LEVEL")]
    pub output_detail: Option<String>,
    /// Folder with the code under test. Repeatable.
    #[arg(long = "source-folder", value_name = "DIR")]
    pub source_folders: Vec<String>,
    /// Only run tests in this folder. Repeatable.
    #[arg(long = "select-by-folder", value_name = "DIR")]
    pub select_by_folders: Vec<String>,
}

impl TestArgs {
    /// Overlays the flags that were given on `defaults`.
    pub fn apply_to(self, mut defaults: TestOptions) -> TestOptions {
        let overlay = |target: &mut Option<String>, value: Option<String>| {
            if value.is_some() {
                *target = value;
            }
        };
        overlay(&mut defaults.pdf_report, self.pdf_report);
        overlay(&mut defaults.tap_results, self.tap_results);
        overlay(&mut defaults.junit_results, self.junit_results);
        overlay(&mut defaults.cobertura_code_coverage, self.cobertura_code_coverage);
        overlay(&mut defaults.simulink_test_results, self.simulink_test_results);
        overlay(&mut defaults.cobertura_model_coverage, self.cobertura_model_coverage);
        overlay(&mut defaults.select_by_tag, self.select_by_tag);
        overlay(&mut defaults.logging_level, self.logging_level);
        overlay(&mut defaults.output_detail, self.output_detail);
        defaults.use_parallel |= self.use_parallel;
        defaults.strict |= self.strict;
        if !self.source_folders.is_empty() {
            defaults.source_folders = self.source_folders;
        }
        if !self.select_by_folders.is_empty() {
            defaults.select_by_folders = self.select_by_folders;
        }
        defaults
    }
}

/// Parses `KEY=VALUE`. The value may be empty and may contain `=`.
pub fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_pair() {
        assert_eq!(
            parse_env_pair("A=b=c").unwrap(),
            ("A".to_string(), "b=c".to_string())
        );
        assert_eq!(parse_env_pair("EMPTY=").unwrap().1, "");
        assert!(parse_env_pair("=x").is_err());
        assert!(parse_env_pair("NOEQUALS").is_err());
    }

    #[test]
    fn test_test_args_override_defaults() {
        let defaults = TestOptions {
            junit_results: Some("config.xml".to_string()),
            tap_results: Some("results.tap".to_string()),
            source_folders: vec!["src".to_string()],
            ..TestOptions::default()
        };
        let args = TestArgs {
            junit_results: Some("cli.xml".to_string()),
            strict: true,
            ..TestArgs::default()
        };

        let options = args.apply_to(defaults);
        assert_eq!(options.junit_results.as_deref(), Some("cli.xml"));
        assert_eq!(options.tap_results.as_deref(), Some("results.tap"));
        assert!(options.strict);
        assert_eq!(options.source_folders, vec!["src"]);
    }
}
