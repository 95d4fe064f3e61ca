//! mpiconf - probe an installed MPI and configure the managed bindings for it
//!
//! This crate provides the library behind the `mpiconf` command: MPI
//! implementation detection, header lookup, linkage validation, link flag
//! collection, the integer size probe, and the handoff to the bridge
//! generator.

pub mod error;
pub mod generate;
pub mod mpi;
pub mod ops;
pub mod probe;
pub mod sizes;
pub mod util;

/// Scripted toolchain stand-ins for unit tests.
///
/// This module is only available when compiling with `--cfg test`.
#[cfg(test)]
pub mod test_support;

pub use error::ConfigureError;
pub use mpi::{ImplementationDescriptor, ImplementationKind, LinkFlags};
pub use ops::{ConfigureOptions, ConfigureOutcome, ConfigureReport, PlatformSupport};
pub use sizes::SizeSet;
pub use util::context::GlobalContext;
