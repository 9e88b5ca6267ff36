// src/core/error.rs

//! Errors raised while preparing or running MATLAB.

use crate::system::executor::ExecutionError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop a MATLAB run.
///
/// Only [`RunnerError::ExecutionFailed`] is reported by MATLAB itself. The other variants
/// are problems with the host: missing resources, an unwritable workspace, a launcher that
/// could not be started.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// The workspace could not be created.
    #[error("Workspace '{}' does not exist and could not be created: {source}", path.display())]
    WorkspaceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The scratch folder could not be created.
    #[error("Unable to create temporary directory in workspace '{}': {source}", path.display())]
    TempAllocationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Platform detection could not run.
    #[error("Could not determine the platform of this host: {source}")]
    PlatformDetectionFailed {
        #[source]
        source: ExecutionError,
    },
    /// The launcher could not be copied or made executable.
    #[error("Could not stage launcher '{}' into the scratch folder: {source}", resource.display())]
    ExecutableStagingFailed {
        resource: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A resource could not be copied into the scratch folder.
    #[error("Could not copy resource '{}' into the scratch folder: {source}", resource.display())]
    ResourceCopyFailed {
        resource: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The script file could not be written.
    #[error("Could not write MATLAB script in '{}': {source}", dir.display())]
    ScriptWriteFailed {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The launcher process could not be started or waited on.
    #[error("Could not start MATLAB: {source}")]
    SpawnFailed {
        #[source]
        source: ExecutionError,
    },
    /// MATLAB ran and exited with `code`.
    #[error("MATLAB exited with non-zero code: {code}")]
    ExecutionFailed { code: i32 },
    /// The cancellation token was set.
    #[error("MATLAB run was cancelled.")]
    Cancelled,
}

impl RunnerError {
    /// The MATLAB exit code, if this is a tool-reported failure.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RunnerError::ExecutionFailed { code } => Some(*code),
            _ => None,
        }
    }

    /// `true` when MATLAB ran and failed, as opposed to an infrastructure problem.
    pub fn is_execution_failure(&self) -> bool {
        matches!(self, RunnerError::ExecutionFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_execution_failures_carry_exit_code() {
        let failed = RunnerError::ExecutionFailed { code: 12 };
        assert_eq!(failed.exit_code(), Some(12));
        assert!(failed.is_execution_failure());
        assert_eq!(failed.to_string(), "MATLAB exited with non-zero code: 12");

        let spawn = RunnerError::SpawnFailed {
            source: ExecutionError::EmptyCommand,
        };
        assert_eq!(spawn.exit_code(), None);
        assert!(!spawn.is_execution_failure());
        assert!(!RunnerError::Cancelled.is_execution_failure());
    }
}
