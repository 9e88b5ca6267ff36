// src/core/workspace.rs

//! Per-runner scratch folders inside the caller's workspace.

use crate::{
    constants::{SCRATCH_DIR_PREFIX, SCRATCH_ROOT_DIR},
    core::error::RunnerError,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

// A sibling may remove the empty scratch root between our mkdir and tempdir calls.
const PROVISION_ATTEMPTS: u32 = 3;

/// A private, uniquely named folder under `<workspace>/.matlab`.
///
/// Launchers, plugins and generated scripts live here. The folder is removed by
/// [`ScratchWorkspace::dispose`], or when the value is dropped.
#[derive(Debug)]
pub struct ScratchWorkspace {
    path: PathBuf,
    root: PathBuf,
    dir: Option<TempDir>,
}

impl ScratchWorkspace {
    /// Creates a fresh scratch folder inside `base`, creating `base` first if needed.
    pub fn provision(base: &Path) -> Result<Self, RunnerError> {
        if !base.exists() {
            fs::create_dir_all(base).map_err(|source| RunnerError::WorkspaceUnavailable {
                path: base.to_path_buf(),
                source,
            })?;
        }

        let root = base.join(SCRATCH_ROOT_DIR);
        let mut attempt = 1;
        let dir = loop {
            match create_unique_dir(&root) {
                Ok(dir) => break dir,
                Err(e) if e.kind() == io::ErrorKind::NotFound && attempt < PROVISION_ATTEMPTS => {
                    attempt += 1;
                }
                Err(source) => {
                    return Err(RunnerError::TempAllocationFailed {
                        path: base.to_path_buf(),
                        source,
                    });
                }
            }
        };

        let path = dunce::simplified(dir.path()).to_path_buf();
        log::debug!("Provisioned scratch folder '{}'", path.display());
        Ok(Self {
            path,
            root,
            dir: Some(dir),
        })
    }

    /// Absolute path of the scratch folder.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copies a file byte-for-byte to `target` (relative to the scratch folder) and marks
    /// it executable.
    pub fn copy_resource(&self, source: &Path, target: &str) -> io::Result<PathBuf> {
        let destination = self.path.join(target);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, &destination)?;
        set_executable(&destination)?;
        log::debug!(
            "Copied '{}' to '{}'",
            source.display(),
            destination.display()
        );
        Ok(destination)
    }

    /// Copies the contents of directory `source` into `target` (relative to the scratch
    /// folder). An empty `target` copies into the scratch folder itself.
    pub fn copy_resource_tree(&self, source: &Path, target: &str) -> io::Result<PathBuf> {
        let destination = self.path.join(target);
        for entry in WalkDir::new(source) {
            let entry = entry.map_err(io::Error::other)?;
            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(io::Error::other)?;
            let to = destination.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&to)?;
            } else {
                if let Some(parent) = to.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(entry.path(), &to)?;
            }
        }
        Ok(destination)
    }

    /// Recursively deletes the scratch folder. Calling it again, or after the folder has
    /// disappeared, does nothing.
    pub fn dispose(&mut self) -> io::Result<()> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };
        match dir.close() {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
            _ => {}
        }
        // Fails while siblings still have scratch folders here, which is fine.
        if fs::remove_dir(&self.root).is_ok() {
            log::debug!("Removed empty scratch root '{}'", self.root.display());
        }
        Ok(())
    }
}

fn create_unique_dir(root: &Path) -> io::Result<TempDir> {
    fs::create_dir_all(root)?;
    tempfile::Builder::new()
        .prefix(SCRATCH_DIR_PREFIX)
        .tempdir_in(root)
}

#[cfg(unix)]
fn set_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
