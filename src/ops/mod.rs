//! High-level operations.
//!
//! This module contains the implementation of mpiconf commands.

pub mod mpiconf_configure;

pub use mpiconf_configure::{
    configure, detect, probe_mpi, probe_sizes, ConfigureOptions, ConfigureOutcome,
    ConfigureReport, MpiFacts, PlatformSupport,
};
