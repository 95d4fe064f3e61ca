//! Decide whether a C bridge layer is needed, and check that MPICH is shared.

use anyhow::Result;
use serde::Serialize;

use crate::error::ConfigureError;
use crate::probe::Probe;

use super::{ImplementationDescriptor, ImplementationKind};

/// Define telling the managed sources that MPI handles are pointer sized.
pub const HANDLES_ARE_POINTERS: &str = "MPI_HANDLES_ARE_POINTERS";

/// Whether generated glue is needed, and the defines downstream sources need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeRequirement {
    pub needs_bridge_layer: bool,
    pub defines: Vec<String>,
}

impl BridgeRequirement {
    /// Handles go through the generated C bridge.
    pub fn bridged() -> Self {
        BridgeRequirement {
            needs_bridge_layer: true,
            defines: vec![HANDLES_ARE_POINTERS.to_string()],
        }
    }

    /// The managed caller binds the shared library directly.
    pub fn direct() -> Self {
        BridgeRequirement {
            needs_bridge_layer: false,
            defines: vec![HANDLES_ARE_POINTERS.to_string()],
        }
    }

    /// Defines as managed-compiler arguments (`-define:NAME`).
    pub fn define_flags(&self) -> Vec<String> {
        self.defines
            .iter()
            .map(|d| format!("-define:{}", d))
            .collect()
    }
}

impl Default for BridgeRequirement {
    fn default() -> Self {
        BridgeRequirement::bridged()
    }
}

/// Bridge requirement for a resolved implementation.
///
/// Only MPICH can be bound directly, and only once its linkage is validated.
pub fn bridge_requirement(
    probe: &dyn Probe,
    descriptor: &ImplementationDescriptor,
) -> Result<BridgeRequirement> {
    match descriptor.kind {
        ImplementationKind::Mpich => validate_shared_mpich(probe, descriptor),
        ImplementationKind::OpenMpi | ImplementationKind::Lam => Ok(BridgeRequirement::bridged()),
    }
}

/// Check that MPICH was built as a shared library.
///
/// libpmpich depends on libmpich, and that dependency is only recorded in the
/// shared libraries. With a static-only MPICH the libpmpich check fails while
/// the libmpich check passes; with a shared MPICH both pass. The two checks
/// must run in this order.
pub fn validate_shared_mpich(
    probe: &dyn Probe,
    descriptor: &ImplementationDescriptor,
) -> Result<BridgeRequirement> {
    let base = descriptor.shared_lib_name;
    let profiling = format!("p{}", base);
    let base_init = "MPI_Init";
    let profiling_init = format!("{}_Init", descriptor.func_prefix);

    let have_profiling = probe.check_lib(&profiling, base_init)?.success;
    let have_base = probe.check_lib(base, &profiling_init)?.success;
    tracing::debug!(
        "lib{}: {}, lib{}: {}",
        profiling,
        have_profiling,
        base,
        have_base
    );

    if have_base && !have_profiling {
        return Err(ConfigureError::StaticOnlyLibrary.into());
    }

    Ok(BridgeRequirement::direct())
}
