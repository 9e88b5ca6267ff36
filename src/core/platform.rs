// src/core/platform.rs

//! Host platform detection and launcher staging.

use crate::{
    core::{error::RunnerError, workspace::ScratchWorkspace},
    models::{Platform, StagedExecutable},
    system::executor::Launcher,
};
use std::io;
use std::path::Path;

/// Maps probe output to a platform when every pattern occurs in it (case-sensitive).
#[derive(Debug)]
struct ProbeRule {
    patterns: &'static [&'static str],
    platform: Platform,
}

/// Evaluated top to bottom; the first matching rule wins.
const PROBE_RULES: &[ProbeRule] = &[
    ProbeRule {
        patterns: &["Linux", "aarch64"],
        platform: Platform::LinuxArm64,
    },
    ProbeRule {
        patterns: &["Linux"],
        platform: Platform::LinuxX64,
    },
    ProbeRule {
        patterns: &["arm64"],
        platform: Platform::MacArm64,
    },
];

/// Used when no rule matches. Any other Unix is treated as an Intel Mac.
const PROBE_FALLBACK: Platform = Platform::MacX64;

/// Classifies the output of `uname -s -m`.
pub fn classify_probe_output(output: &str) -> Platform {
    PROBE_RULES
        .iter()
        .find(|rule| rule.patterns.iter().all(|p| output.contains(p)))
        .map_or(PROBE_FALLBACK, |rule| rule.platform)
}

/// Finds out which launcher variant this host needs and stages it.
#[derive(Debug, Clone)]
pub struct PlatformResolver {
    probe_command: Vec<String>,
}

impl PlatformResolver {
    /// Resolver that runs the given detection command on Unix hosts.
    pub fn new(probe_command: Vec<String>) -> Self {
        Self { probe_command }
    }

    /// Probes Unix hosts; Windows hosts are known without asking.
    pub fn resolve(&self, launcher: &Launcher) -> Result<Platform, RunnerError> {
        if !launcher.is_unix() {
            return Ok(Platform::WindowsX64);
        }

        let output = launcher
            .capture(&self.probe_command)
            .map_err(|source| RunnerError::PlatformDetectionFailed { source })?;
        let platform = classify_probe_output(&output);
        log::debug!(
            "Platform probe reported '{}', using {}",
            output.trim(),
            platform
        );
        Ok(platform)
    }

    /// Copies the bundled launcher for `platform` into the scratch folder.
    pub fn stage(
        platform: Platform,
        resource_dir: &Path,
        scratch: &ScratchWorkspace,
    ) -> Result<StagedExecutable, RunnerError> {
        let resource = resource_dir.join(platform.resource_path());
        if !resource.is_file() {
            return Err(RunnerError::ExecutableStagingFailed {
                source: io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no bundled launcher for {}", platform),
                ),
                resource,
            });
        }

        let path = scratch
            .copy_resource(&resource, platform.executable_name())
            .map_err(|source| RunnerError::ExecutableStagingFailed {
                resource: resource.clone(),
                source,
            })?;

        Ok(StagedExecutable {
            platform,
            path,
            executable: true,
        })
    }
}
