//! Explicit link flags for Open MPI.
//!
//! libtool ignores the compiler wrapper when linking, so the library search
//! directories and library names have to be passed to the final link step by
//! hand.

use std::fmt;

use anyhow::{Context, Result};
use serde::Serialize;

use super::{tokenize, WrapperQuery};

/// Wrapper flag listing library search directories.
pub const LIBDIRS_FLAG: &str = "--showme:libdirs";

/// Wrapper flag listing library names.
pub const LIBS_FLAG: &str = "--showme:libs";

/// Ordered linker arguments: every `-L<dir>`, then every `-l<name>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LinkFlags(Vec<String>);

impl LinkFlags {
    /// Build flags from directories and library names, keeping both orders.
    pub fn from_parts<D, L>(dirs: D, libs: L) -> Self
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        L: IntoIterator,
        L::Item: AsRef<str>,
    {
        let mut flags: Vec<String> = dirs
            .into_iter()
            .map(|d| format!("-L{}", d.as_ref()))
            .collect();
        flags.extend(libs.into_iter().map(|l| format!("-l{}", l.as_ref())));
        LinkFlags(flags)
    }

    /// The flags, in link order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LinkFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// Query the wrapper for library directories and names.
pub fn collect_link_flags(wrapper: &dyn WrapperQuery) -> Result<LinkFlags> {
    let dirs = wrapper
        .query(LIBDIRS_FLAG)
        .with_context(|| format!("failed to query `{}`", LIBDIRS_FLAG))?;
    let libs = wrapper
        .query(LIBS_FLAG)
        .with_context(|| format!("failed to query `{}`", LIBS_FLAG))?;

    let flags = LinkFlags::from_parts(tokenize(&dirs), tokenize(&libs));
    tracing::info!("MPI link flags: {}", flags);
    Ok(flags)
}
