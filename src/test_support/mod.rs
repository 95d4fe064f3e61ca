//! Scripted stand-ins for the compiler and wrapper, for unit tests.
//!
//! The pipeline stages talk to the toolchain only through [`Probe`] and
//! [`WrapperQuery`], so tests can describe an MPI installation as data:
//! which macros `mpi.h` defines, which libraries link, and what the wrapper
//! prints for each flag.
//!
//! # Example
//!
//! ```rust,ignore
//! let probe = ScriptedProbe::with_macros(&["OPEN_MPI"]);
//! let wrapper = ScriptedWrapper::new()
//!     .respond("--showme:libdirs", "/usr/lib")
//!     .respond("--showme:libs", "mpi");
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::mpi::WrapperQuery;
use crate::probe::{Probe, ProbeOutcome};

/// Probe that answers from a description of the installation.
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    macros: HashSet<String>,
    libraries: HashSet<String>,
    compiles: RefCell<Vec<String>>,
    link_checks: RefCell<Vec<(String, String)>>,
}

impl ScriptedProbe {
    /// Installation whose `mpi.h` defines the given macros.
    pub fn with_macros(macros: &[&str]) -> Self {
        ScriptedProbe {
            macros: macros.iter().map(|m| m.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Make `library` linkable.
    pub fn with_library(mut self, library: &str) -> Self {
        self.libraries.insert(library.to_string());
        self
    }

    /// Number of trial compiles performed.
    pub fn compile_count(&self) -> usize {
        self.compiles.borrow().len()
    }

    /// Link checks performed, in order, as `(library, function)`.
    pub fn link_checks(&self) -> Vec<(String, String)> {
        self.link_checks.borrow().clone()
    }
}

impl Probe for ScriptedProbe {
    fn try_compile(&self, fragment: &str) -> Result<ProbeOutcome> {
        self.compiles.borrow_mut().push(fragment.to_string());
        let defined = self
            .macros
            .iter()
            .any(|m| fragment.contains(&format!("defined({})", m)));
        if defined {
            Ok(ProbeOutcome::passed(""))
        } else {
            Ok(ProbeOutcome::failed("#error"))
        }
    }

    fn check_lib(&self, library: &str, function: &str) -> Result<ProbeOutcome> {
        self.link_checks
            .borrow_mut()
            .push((library.to_string(), function.to_string()));
        if self.libraries.contains(library) {
            Ok(ProbeOutcome::passed(""))
        } else {
            Ok(ProbeOutcome::failed(format!("cannot find -l{}", library)))
        }
    }
}

/// Wrapper that replays canned output per flag.
#[derive(Debug, Default)]
pub struct ScriptedWrapper {
    responses: HashMap<String, String>,
    queries: RefCell<Vec<String>>,
}

impl ScriptedWrapper {
    /// Create a wrapper with no responses.
    pub fn new() -> Self {
        ScriptedWrapper::default()
    }

    /// Print `output` when queried with `flag`.
    pub fn respond(mut self, flag: &str, output: &str) -> Self {
        self.responses.insert(flag.to_string(), output.to_string());
        self
    }

    /// Flags queried, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }
}

impl WrapperQuery for ScriptedWrapper {
    fn query(&self, flag: &str) -> Result<String> {
        self.queries.borrow_mut().push(flag.to_string());
        match self.responses.get(flag) {
            Some(output) => Ok(output.clone()),
            None => bail!("unexpected wrapper flag `{}`", flag),
        }
    }
}

/// Create `dir/mpi.h` (and `dir`) under `root`, returning the directory.
pub fn make_include_dir(root: &Path, dir: &str, with_header: bool) -> PathBuf {
    let path = root.join(dir);
    std::fs::create_dir_all(&path).expect("create include dir");
    if with_header {
        std::fs::write(path.join("mpi.h"), "/* mpi.h */\n").expect("write mpi.h");
    }
    path
}
