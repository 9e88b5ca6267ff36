// src/core/script.rs

//! Generation of the temporary `.m` script a command runs from.

use crate::{
    constants::{
        ORIG_WORKING_FOLDER_VAR, SCRIPT_FILE_EXTENSION, SCRIPT_FILE_PREFIX, SCRIPT_NAME_RANDOM_LEN,
    },
    core::error::RunnerError,
    models::ScriptArtifact,
    system::output,
};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

/// Lines put in front of every script: return to the folder MATLAB started in, then a
/// blank line.
pub fn preamble() -> String {
    format!("cd(getenv('{}'));\n\n", ORIG_WORKING_FOLDER_VAR)
}

/// Substitutes `$VAR` and `${VAR}` references found in `env`.
///
/// Unknown variables stay in the text exactly as written.
pub fn expand_variables(content: &str, env: &HashMap<String, String>) -> String {
    shellexpand::env_with_context_no_errors(content, |name: &str| env.get(name)).into_owned()
}

/// Expands `content`, writes it with the preamble to a new `script_XXXXXXXX.m` in `dir`
/// and echoes the expanded code to the build log.
pub fn write_script(
    dir: &Path,
    content: &str,
    env: &HashMap<String, String>,
    log: &mut dyn Write,
) -> Result<ScriptArtifact, RunnerError> {
    let to_error = |source| RunnerError::ScriptWriteFailed {
        dir: dir.to_path_buf(),
        source,
    };

    let expanded_content = expand_variables(content, env);
    let final_content = format!("{}{}", preamble(), expanded_content);

    output::write_line(
        log,
        &format!(
            "Generating MATLAB script with content:\n{}\n\n",
            expanded_content
        ),
    );

    // Exclusive creation; a name that already exists is retried with fresh characters.
    let mut file = tempfile::Builder::new()
        .prefix(SCRIPT_FILE_PREFIX)
        .suffix(SCRIPT_FILE_EXTENSION)
        .rand_bytes(SCRIPT_NAME_RANDOM_LEN)
        .tempfile_in(dir)
        .map_err(to_error)?;
    file.write_all(final_content.as_bytes()).map_err(to_error)?;
    file.flush().map_err(to_error)?;
    let (_, path) = file.keep().map_err(|e| to_error(e.error))?;

    let base_name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    log::debug!("Wrote script '{}'", path.display());

    Ok(ScriptArtifact {
        path,
        base_name,
        raw_content: content.to_string(),
        expanded_content,
    })
}
