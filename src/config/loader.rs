//! Startup argument ingestion from the supervisor's handoff directory.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::options::StartupOptions;
use crate::error::BootError;

/// Environment variable naming the handoff directory.
pub const WORK_DIR_ENV: &str = "SPAWN_WORK_DIR";

/// Resolve the handoff directory from the value of [`WORK_DIR_ENV`].
///
/// An unset or empty value is [`BootError::MissingEnv`].
pub fn work_dir_from(value: Option<OsString>) -> Result<PathBuf, BootError> {
    match value {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => Err(BootError::MissingEnv(WORK_DIR_ENV)),
    }
}

/// Read every file in `dir` into a [`StartupOptions`] mapping.
///
/// Each entry's base name becomes a key and its full contents the value.
/// Subdirectories are skipped; the listing is not recursive.
pub fn read_startup_arguments(dir: &Path) -> Result<StartupOptions, BootError> {
    let entries = fs::read_dir(dir).map_err(|e| BootError::io(dir, e))?;

    let mut values = BTreeMap::new();
    for entry in entries {
        let entry = entry.map_err(|e| BootError::io(dir, e))?;
        let path = entry.path();

        if path.is_dir() {
            tracing::debug!(path = %path.display(), "Skipping directory in startup arguments");
            continue;
        }

        let name = entry
            .file_name()
            .into_string()
            .map_err(BootError::InvalidKey)?;
        let value = fs::read(&path).map_err(|e| BootError::io(&path, e))?;

        tracing::debug!(key = %name, bytes = value.len(), "Startup argument read");
        values.insert(name, value);
    }

    Ok(StartupOptions::from_supervisor(values))
}
