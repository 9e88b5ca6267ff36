// src/core/test_support.rs

//! A fake `run-matlab-command` and the directories around it.

use crate::{
    models::{HostKind, Platform, RunnerParameters},
    system::{executor::Launcher, output::SharedBuffer},
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tempfile::TempDir;

/// Prints where it runs, a few variables and every argument, then exits with
/// `$FAKE_EXIT_CODE`. With `$FAKE_ARTIFACT` set it also writes a build artifact the way
/// the build report plugin would.
pub(crate) const FAKE_LAUNCHER: &str = r#"#!/bin/sh
echo "cwd=$(pwd)"
echo "marker=$MW_ORIG_WORKING_FOLDER"
echo "action=$MW_BUILD_PLUGIN_ACTION_ID"
if [ -f "$MW_MATLAB_TEMP_FOLDER/+ciplugins/+runner/BuildReportPlugin.m" ]; then
    echo "plugins=staged"
fi
if [ -n "$FAKE_ARTIFACT" ]; then
    printf '%s' "$FAKE_ARTIFACT" > "$MW_MATLAB_TEMP_FOLDER/buildArtifact.json"
fi
for arg in "$@"; do
    printf 'arg=%s\n' "$arg"
done
exit "${FAKE_EXIT_CODE:-0}"
"#;

pub(crate) struct Fixture {
    root: TempDir,
    pub(crate) log: SharedBuffer,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let resources = root.path().join("resources");
        for platform in Platform::ALL {
            let launcher = resources.join(platform.resource_path());
            fs::create_dir_all(launcher.parent().unwrap()).unwrap();
            fs::write(&launcher, FAKE_LAUNCHER).unwrap();
        }
        Self {
            root,
            log: SharedBuffer::new(),
        }
    }

    pub(crate) fn root(&self) -> &Path {
        self.root.path()
    }

    pub(crate) fn resources(&self) -> PathBuf {
        self.root().join("resources")
    }

    pub(crate) fn workspace(&self) -> PathBuf {
        self.root().join("ws")
    }

    /// Adds a bundled resource file, e.g. a build plugin.
    pub(crate) fn add_resource(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.resources().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// Overwrites every bundled launcher variant with `content`.
    pub(crate) fn replace_launchers(&self, content: &str) {
        for platform in Platform::ALL {
            self.add_resource(platform.resource_path(), content);
        }
    }

    pub(crate) fn launcher(&self) -> Launcher {
        Launcher::new(HostKind::Unix, Arc::new(AtomicBool::new(false)))
    }

    pub(crate) fn params(&self) -> RunnerParameters {
        RunnerParameters::new(self.workspace(), self.resources())
            .with_probe_command(vec!["echo".to_string(), "Linux x86_64".to_string()])
            .with_launcher(self.launcher())
            .with_log(self.log.sink())
    }

    /// Generated scripts in `dir`, sorted by name.
    pub(crate) fn scripts(&self, dir: &Path) -> Vec<PathBuf> {
        let mut scripts: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| {
                let name = path.file_name().unwrap().to_string_lossy();
                name.starts_with("script_") && name.ends_with(".m")
            })
            .collect();
        scripts.sort();
        scripts
    }
}

/// Values of every `prefix<value>` line in `output`.
pub(crate) fn lines_with_prefix(output: &str, prefix: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.strip_prefix(prefix))
        .map(str::to_string)
        .collect()
}
