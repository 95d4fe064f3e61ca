//! Facts about the installed MPI implementation.
//!
//! The compiler wrapper (`mpicc`) is the only source of truth: it is probed
//! with trial compiles to identify the implementation, and queried with its
//! "show" flags for include and link settings.

pub mod flags;
pub mod header;
pub mod implementation;
pub mod linkage;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use crate::util::process::ProcessBuilder;

pub use flags::{collect_link_flags, LinkFlags};
pub use header::locate_header;
pub use implementation::{resolve_implementation, ImplementationDescriptor, ImplementationKind};
pub use linkage::{bridge_requirement, BridgeRequirement};

/// Something that answers the wrapper's "show flags" queries.
pub trait WrapperQuery {
    /// Run the wrapper with `flag` and return its stdout.
    fn query(&self, flag: &str) -> Result<String>;
}

/// The MPI compiler wrapper executable.
#[derive(Debug, Clone)]
pub struct MpiWrapper {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl MpiWrapper {
    /// Create a wrapper handle for `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        MpiWrapper {
            program: program.into(),
            timeout: None,
        }
    }

    /// Bound each query.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl WrapperQuery for MpiWrapper {
    fn query(&self, flag: &str) -> Result<String> {
        let output = ProcessBuilder::new(&self.program)
            .arg(flag)
            .timeout(self.timeout)
            .exec_and_check()?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Split wrapper output into whitespace-separated tokens.
pub fn tokenize(output: &str) -> Vec<String> {
    output.split_whitespace().map(str::to_string).collect()
}
