//! Identify which MPI implementation the wrapper compiles against.
//!
//! Each known implementation defines a distinctive macro in `mpi.h`. A trial
//! compile that `#error`s unless the macro is defined tells them apart.
//! Candidates are tried in a fixed order and the first match wins.

use std::fmt;

use anyhow::Result;
use serde::Serialize;

use crate::error::ConfigureError;
use crate::probe::Probe;

/// Known MPI implementation families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImplementationKind {
    /// MPICH and its derivatives
    Mpich,
    /// Open MPI
    OpenMpi,
    /// LAM/MPI
    Lam,
}

impl ImplementationKind {
    /// Short identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImplementationKind::Mpich => "mpich",
            ImplementationKind::OpenMpi => "openmpi",
            ImplementationKind::Lam => "lam",
        }
    }

    /// Name printed when the implementation is detected.
    pub fn display_name(&self) -> &'static str {
        match self {
            ImplementationKind::Mpich => "MPICH-based",
            ImplementationKind::OpenMpi => "Open MPI",
            ImplementationKind::Lam => "LAM/MPI",
        }
    }
}

impl fmt::Display for ImplementationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// What the rest of the pipeline needs to know about an implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImplementationDescriptor {
    /// Implementation family
    pub kind: ImplementationKind,
    /// Wrapper flag that prints compile settings
    pub compile_info_flag: &'static str,
    /// Wrapper flag that prints link settings
    pub link_info_flag: &'static str,
    /// Base name of the shared library (`lib<name>.so`)
    pub shared_lib_name: &'static str,
    /// Prefix of exported function symbols
    pub func_prefix: &'static str,
}

impl ImplementationDescriptor {
    /// Descriptor for a family.
    pub const fn for_kind(kind: ImplementationKind) -> Self {
        match kind {
            ImplementationKind::Mpich => ImplementationDescriptor {
                kind,
                compile_info_flag: "-show",
                link_info_flag: "-show",
                shared_lib_name: "mpich",
                func_prefix: "PMPI",
            },
            ImplementationKind::OpenMpi => ImplementationDescriptor {
                kind,
                compile_info_flag: "--showme:compile",
                link_info_flag: "--showme:link",
                shared_lib_name: "mpi",
                func_prefix: "MPI",
            },
            ImplementationKind::Lam => ImplementationDescriptor {
                kind,
                compile_info_flag: "--showme",
                link_info_flag: "--showme",
                shared_lib_name: "mpi",
                func_prefix: "MPI",
            },
        }
    }
}

/// One implementation to test for.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub kind: ImplementationKind,
    /// Preprocessor expression true only for this implementation
    pub guard: &'static str,
}

impl Candidate {
    /// Source fragment that compiles iff the guard holds.
    pub fn fragment(&self) -> String {
        format!(
            "#include <mpi.h>\n#if !({guard})\n#  error Not {name}\n#endif\n",
            guard = self.guard,
            name = self.kind.display_name()
        )
    }
}

/// Candidates in the order they are tried.
pub const CANDIDATES: [Candidate; 3] = [
    Candidate {
        kind: ImplementationKind::Mpich,
        guard: "defined(MPICH)",
    },
    Candidate {
        kind: ImplementationKind::OpenMpi,
        guard: "defined(OPEN_MPI)",
    },
    Candidate {
        kind: ImplementationKind::Lam,
        guard: "defined(LAM_MPI)",
    },
];

/// Resolve the implementation using the standard candidate list.
pub fn resolve_implementation(probe: &dyn Probe) -> Result<ImplementationDescriptor> {
    resolve_from(probe, &CANDIDATES)
}

/// Resolve against an explicit candidate list. The first candidate whose
/// guard compiles is returned; later candidates are not probed.
pub fn resolve_from(probe: &dyn Probe, candidates: &[Candidate]) -> Result<ImplementationDescriptor> {
    for candidate in candidates {
        tracing::debug!("checking for {}", candidate.kind.display_name());
        let outcome = probe.try_compile(&candidate.fragment())?;
        if outcome.success {
            tracing::info!("{}", candidate.kind.display_name());
            return Ok(ImplementationDescriptor::for_kind(candidate.kind));
        }
        tracing::debug!(
            "not {}: {}",
            candidate.kind.display_name(),
            outcome.diagnostics.trim()
        );
    }

    Err(ConfigureError::NotRecognized {
        tried: candidates
            .iter()
            .map(|c| c.kind.display_name().to_string())
            .collect(),
    }
    .into())
}
