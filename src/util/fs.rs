//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::error::ConfigureError;

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents)
        .with_context(|| format!("failed to write file: {}", path.display()))
}

/// Check that `path` is a regular, non-empty file.
pub fn is_nonempty_file(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// Replace `target` with `replacement` in a single rename.
///
/// The replacement is verified first. `target` is never removed on its own:
/// if the rename fails, both files are left where they were.
pub fn replace_file(replacement: &Path, target: &Path) -> Result<()> {
    if !is_nonempty_file(replacement) {
        return Err(ConfigureError::MissingGeneratedOutput {
            path: replacement.to_path_buf(),
        }
        .into());
    }

    fs::rename(replacement, target).with_context(|| {
        format!(
            "failed to move {} over {}",
            replacement.display(),
            target.display()
        )
    })?;

    tracing::debug!(
        "replaced {} with {}",
        target.display(),
        replacement.display()
    );
    Ok(())
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve_in(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
