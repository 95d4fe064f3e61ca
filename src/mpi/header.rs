//! Locate `mpi.h` among the wrapper's include directories.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::error::ConfigureError;

use super::{tokenize, ImplementationDescriptor, WrapperQuery};

/// File name of the MPI header.
pub const HEADER_NAME: &str = "mpi.h";

/// Extract include directories from compile-settings output.
///
/// Recognizes `-I<dir>` and the split form `-I <dir>`. Order is preserved and
/// repeated directories are kept only at their first position.
pub fn include_dirs(output: &str) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    let mut tokens = tokenize(output).into_iter();

    while let Some(token) = tokens.next() {
        let dir = match token.strip_prefix("-I") {
            Some("") => match tokens.next() {
                Some(next) => next,
                None => break,
            },
            Some(rest) => rest.to_string(),
            None => continue,
        };
        let dir = PathBuf::from(dir);
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }

    dirs
}

/// First `dir/mpi.h` that is a regular file.
pub fn find_header(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .map(|dir| dir.join(HEADER_NAME))
        .find(|candidate| candidate.is_file())
}

/// Ask the wrapper for its include path and find `mpi.h` on it.
pub fn locate_header(
    wrapper: &dyn WrapperQuery,
    descriptor: &ImplementationDescriptor,
) -> Result<PathBuf> {
    let output = wrapper
        .query(descriptor.compile_info_flag)
        .with_context(|| {
            format!(
                "failed to query include directories with `{}`",
                descriptor.compile_info_flag
            )
        })?;

    let dirs = include_dirs(&output);
    tracing::debug!("include directories: {:?}", dirs);

    match find_header(&dirs) {
        Some(header) => {
            tracing::info!("MPI header: {}", header.display());
            Ok(header)
        }
        None => Err(ConfigureError::HeaderNotFound { searched: dirs }.into()),
    }
}
