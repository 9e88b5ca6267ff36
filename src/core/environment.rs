// src/core/environment.rs

//! Composition of the environment a MATLAB process runs with.

use crate::constants::ORIG_WORKING_FOLDER_VAR;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

const PATH_VAR: &str = "PATH";

/// Builds the environment of each MATLAB process.
///
/// Layers, lowest precedence first: the base snapshot, then variables added through
/// [`add_variable`](Self::add_variable). The working-folder marker is not a layer; it is
/// set by [`compose`](Self::compose) and always wins.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentComposer {
    base: HashMap<String, String>,
    overrides: HashMap<String, String>,
    matlab_root: Option<PathBuf>,
}

impl EnvironmentComposer {
    /// Composer over a snapshot of the caller's environment.
    pub fn new(base: HashMap<String, String>) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    /// Puts `<root>/bin` in front of `PATH` in every composed environment.
    pub fn with_matlab_root(mut self, root: Option<PathBuf>) -> Self {
        self.matlab_root = root;
        self
    }

    /// Adds or replaces a variable for every later process.
    pub fn add_variable(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if key == ORIG_WORKING_FOLDER_VAR {
            log::warn!(
                "'{}' is reserved and will be overwritten before MATLAB starts.",
                ORIG_WORKING_FOLDER_VAR
            );
        }
        self.overrides.insert(key, value.into());
    }

    /// The snapshot passed to [`new`](Self::new).
    pub fn base(&self) -> &HashMap<String, String> {
        &self.base
    }

    /// Variables added since construction.
    pub fn overrides(&self) -> &HashMap<String, String> {
        &self.overrides
    }

    /// Merges the layers for a process that must return to `working_folder`.
    pub fn compose(&self, working_folder: &Path) -> ComposedEnvironment {
        let mut variables = self.base.clone();
        variables.extend(
            self.overrides
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        if variables.remove(ORIG_WORKING_FOLDER_VAR).is_some() {
            log::debug!("Replacing inherited '{}'.", ORIG_WORKING_FOLDER_VAR);
        }

        let matlab_bin = self.matlab_root.as_ref().map(|root| root.join("bin"));
        if let Some(bin) = &matlab_bin {
            prepend_path(&mut variables, bin, cfg!(windows));
        }

        ComposedEnvironment {
            variables,
            working_folder: working_folder.to_path_buf(),
            matlab_bin,
        }
    }
}

/// Windows spells the variable `Path`, and any casing refers to the same entry there.
fn prepend_path(variables: &mut HashMap<String, String>, dir: &Path, case_insensitive: bool) {
    let key = if case_insensitive && !variables.contains_key(PATH_VAR) {
        variables
            .keys()
            .find(|key| key.eq_ignore_ascii_case(PATH_VAR))
            .cloned()
            .unwrap_or_else(|| PATH_VAR.to_string())
    } else {
        PATH_VAR.to_string()
    };

    let mut entries = vec![dir.to_path_buf()];
    if let Some(current) = variables.get(&key) {
        entries.extend(env::split_paths(current));
    }
    match env::join_paths(entries) {
        Ok(joined) => {
            variables.insert(key, joined.to_string_lossy().into_owned());
        }
        Err(e) => log::warn!("Could not add '{}' to PATH: {}", dir.display(), e),
    }
}

/// The exact environment a MATLAB process starts with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedEnvironment {
    variables: HashMap<String, String>,
    working_folder: PathBuf,
    matlab_bin: Option<PathBuf>,
}

impl ComposedEnvironment {
    /// Value a process will see for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        if name == ORIG_WORKING_FOLDER_VAR {
            return self.working_folder.to_str();
        }
        self.variables.get(name).map(String::as_str)
    }

    /// Value of the working-folder marker.
    pub fn working_folder(&self) -> &Path {
        &self.working_folder
    }

    /// The MATLAB `bin` folder added to `PATH`, if any.
    pub fn matlab_bin(&self) -> Option<&Path> {
        self.matlab_bin.as_deref()
    }

    /// Flattens everything into one map, the marker applied last.
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = self.variables.clone();
        map.insert(
            ORIG_WORKING_FOLDER_VAR.to_string(),
            self.working_folder.to_string_lossy().into_owned(),
        );
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_overrides_beat_base() {
        let mut composer = EnvironmentComposer::new(vars(&[("K", "base"), ("KEEP", "1")]));
        composer.add_variable("K", "override");

        let env = composer.compose(Path::new("/ws")).to_map();
        assert_eq!(env.get("K").map(String::as_str), Some("override"));
        assert_eq!(env.get("KEEP").map(String::as_str), Some("1"));
        assert_eq!(composer.base().get("K").map(String::as_str), Some("base"));
    }

    #[test]
    fn test_later_override_wins() {
        let mut composer = EnvironmentComposer::new(HashMap::new());
        composer.add_variable("K", "first");
        composer.add_variable("K", "second");
        assert_eq!(composer.compose(Path::new("/ws")).get("K"), Some("second"));
        assert_eq!(composer.overrides().len(), 1);
    }

    #[test]
    fn test_marker_is_always_the_working_folder() {
        let mut composer =
            EnvironmentComposer::new(vars(&[(ORIG_WORKING_FOLDER_VAR, "/inherited")]));
        composer.add_variable(ORIG_WORKING_FOLDER_VAR, "/caller");

        let env = composer.compose(Path::new("/ws"));
        assert_eq!(env.working_folder(), Path::new("/ws"));
        assert_eq!(env.get(ORIG_WORKING_FOLDER_VAR), Some("/ws"));
        assert_eq!(
            env.to_map().get(ORIG_WORKING_FOLDER_VAR).map(String::as_str),
            Some("/ws")
        );
    }

    #[test]
    fn test_no_matlab_root_leaves_path_alone() {
        let composer = EnvironmentComposer::new(vars(&[("PATH", "/usr/bin")]));
        let env = composer.compose(Path::new("/ws"));
        assert_eq!(env.get("PATH"), Some("/usr/bin"));
        assert!(env.matlab_bin().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_matlab_root_is_prepended_to_path() {
        let composer = EnvironmentComposer::new(vars(&[("PATH", "/usr/bin:/bin")]))
            .with_matlab_root(Some(PathBuf::from("/opt/matlab")));
        let env = composer.compose(Path::new("/ws"));
        assert_eq!(env.get("PATH"), Some("/opt/matlab/bin:/usr/bin:/bin"));
        assert_eq!(env.matlab_bin(), Some(Path::new("/opt/matlab/bin")));
    }

    #[cfg(unix)]
    #[test]
    fn test_matlab_root_without_existing_path() {
        let composer = EnvironmentComposer::new(HashMap::new())
            .with_matlab_root(Some(PathBuf::from("/opt/matlab")));
        let env = composer.compose(Path::new("/ws"));
        assert_eq!(env.get("PATH"), Some("/opt/matlab/bin"));
    }

    #[test]
    fn test_prepend_path_reuses_differently_cased_key() {
        let bin = PathBuf::from("matlab").join("bin");
        let existing = PathBuf::from("system");
        let mut variables = HashMap::new();
        variables.insert("Path".to_string(), existing.to_string_lossy().into_owned());

        prepend_path(&mut variables, &bin, true);

        let expected = env::join_paths([&bin, &existing]).unwrap();
        assert_eq!(variables.len(), 1);
        assert!(!variables.contains_key("PATH"));
        assert_eq!(
            variables.get("Path").map(String::as_str),
            expected.to_str()
        );
    }

    #[test]
    fn test_prepend_path_is_case_sensitive_elsewhere() {
        let bin = PathBuf::from("matlab");
        let mut variables = HashMap::new();
        variables.insert("Path".to_string(), "other".to_string());

        prepend_path(&mut variables, &bin, false);

        assert_eq!(variables.get("Path").map(String::as_str), Some("other"));
        assert_eq!(variables.get("PATH").map(String::as_str), Some("matlab"));
    }
}
