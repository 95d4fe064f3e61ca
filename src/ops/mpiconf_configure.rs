//! Implementation of `mpiconf configure`.
//!
//! The stages run strictly in order, each blocking on its external process:
//!
//! 1. Platform check
//! 2. Implementation resolution (trial compiles)
//! 3. Header lookup (wrapper compile settings)
//! 4. Linkage validation (MPICH) or link flag collection (Open MPI)
//! 5. Size probe
//! 6. Generator handoff
//!
//! The first failure aborts the run. Nothing is written to the work directory
//! before stage 6, and stage 6 leaves the placeholder alone unless it fully
//! succeeds.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde::Serialize;

use crate::generate::{GeneratorCommand, Handoff, HandoffFiles, InstalledFiles};
use crate::mpi::{
    bridge_requirement, collect_link_flags, locate_header, resolve_implementation,
    BridgeRequirement, ImplementationDescriptor, ImplementationKind, LinkFlags, MpiWrapper,
    WrapperQuery,
};
use crate::probe::{CompilerProbe, Probe};
use crate::sizes::{find_probe_source, SizeProbe, SizeSet, SIZE_PROBE_FILE};
use crate::util::shell::{Shell, Status};

/// Whether this platform needs any probing at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformSupport {
    /// The shipped sources already match the platform's MPI (MS-MPI on Windows).
    NativeAbi,
    /// The installed MPI must be probed.
    RequiresProbing,
}

impl PlatformSupport {
    /// Capability of the platform this binary was built for.
    pub fn host() -> Self {
        if cfg!(windows) {
            PlatformSupport::NativeAbi
        } else {
            PlatformSupport::RequiresProbing
        }
    }

    pub fn requires_probing(self) -> bool {
        self == PlatformSupport::RequiresProbing
    }
}

/// Options for the configure command.
#[derive(Debug, Clone)]
pub struct ConfigureOptions {
    /// Directory holding the placeholder, size probe and generator script
    pub work_dir: PathBuf,

    /// MPI compiler wrapper
    pub wrapper: PathBuf,

    /// Host C compiler for the size probe
    pub cc: PathBuf,

    /// Bound on each external process
    pub timeout: Option<Duration>,

    /// Size probe source, relative to the work directory
    pub size_probe: PathBuf,

    /// Files handed to the generator
    pub files: HandoffFiles,

    /// Generator invocation
    pub generator: GeneratorCommand,

    /// Run the generator after probing
    pub generate: bool,
}

impl Default for ConfigureOptions {
    fn default() -> Self {
        ConfigureOptions {
            work_dir: PathBuf::from("."),
            wrapper: PathBuf::from(crate::util::config::DEFAULT_WRAPPER),
            cc: PathBuf::from(crate::util::config::DEFAULT_CC),
            timeout: None,
            size_probe: PathBuf::from(SIZE_PROBE_FILE),
            files: HandoffFiles::default(),
            generator: GeneratorCommand::default(),
            generate: true,
        }
    }
}

/// Facts learned from the MPI installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MpiFacts {
    pub implementation: ImplementationDescriptor,
    pub header: PathBuf,
    pub bridge: BridgeRequirement,
    /// Explicit link flags; empty unless the implementation needs them
    pub link_flags: LinkFlags,
}

/// Everything a configure run discovered and wrote.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigureReport {
    #[serde(flatten)]
    pub facts: MpiFacts,
    pub sizes: SizeSet,
    /// `None` when generation was skipped
    pub installed: Option<InstalledFiles>,
}

/// Result of a configure run.
#[derive(Debug, Clone)]
pub enum ConfigureOutcome {
    /// The platform needs no probing; nothing was done.
    NotRequired,
    Configured(ConfigureReport),
}

/// Probe the MPI installation: resolve, locate the header, then run the
/// implementation-specific linkage step.
pub fn probe_mpi(probe: &dyn Probe, wrapper: &dyn WrapperQuery, shell: &Shell) -> Result<MpiFacts> {
    let implementation = resolve_implementation(probe)?;
    shell.status(Status::Detected, implementation.kind);

    let header = locate_header(wrapper, &implementation)?;
    shell.status(Status::Found, format!("MPI header: {}", header.display()));

    let bridge = bridge_requirement(probe, &implementation)?;
    let link_flags = match implementation.kind {
        ImplementationKind::OpenMpi => collect_link_flags(wrapper)?,
        ImplementationKind::Mpich | ImplementationKind::Lam => LinkFlags::default(),
    };

    if !bridge.needs_bridge_layer {
        shell.note("shared MPI library found; no C bridge needed");
    }
    if !link_flags.is_empty() {
        shell.note(format!("MPI link flags: {}", link_flags));
    }

    Ok(MpiFacts {
        implementation,
        header,
        bridge,
        link_flags,
    })
}

/// Probe the MPI installation with the configured wrapper.
pub fn detect(opts: &ConfigureOptions, shell: &Shell) -> Result<MpiFacts> {
    let probe = CompilerProbe::new(&opts.wrapper).with_timeout(opts.timeout);
    let wrapper = MpiWrapper::new(&opts.wrapper).with_timeout(opts.timeout);
    probe_mpi(&probe, &wrapper, shell)
}

/// Run the size probe with the configured host compiler.
pub fn probe_sizes(opts: &ConfigureOptions, shell: &Shell) -> Result<SizeSet> {
    shell.status(Status::Probing, "integer type sizes");
    let sizes = SizeProbe::new(&opts.cc)
        .with_source(find_probe_source(&opts.work_dir, &opts.size_probe))
        .with_timeout(opts.timeout)
        .run()?;
    shell.note(format!("Sizes: {:?}", sizes.as_array()));
    Ok(sizes)
}

/// Run the whole configure pipeline.
pub fn configure(
    opts: &ConfigureOptions,
    platform: PlatformSupport,
    shell: &Shell,
) -> Result<ConfigureOutcome> {
    if !platform.requires_probing() {
        shell.status(
            Status::Skipped,
            "sources already match this platform's MPI; nothing to configure",
        );
        return Ok(ConfigureOutcome::NotRequired);
    }

    let start = Instant::now();

    let facts = detect(opts, shell)?;
    let sizes = probe_sizes(opts, shell)?;

    let installed = if opts.generate {
        let handoff = Handoff::new(&opts.work_dir, opts.generator.clone(), opts.files.clone())
            .with_timeout(opts.timeout);
        shell.status(
            Status::Generating,
            handoff.display_command(&facts.header, &sizes),
        );
        let installed = handoff.run(&facts.header, &sizes)?;
        shell.status(Status::Installed, installed.source.display());
        Some(installed)
    } else {
        shell.status(Status::Skipped, "generator (--no-generate)");
        None
    };

    shell.finished("configuration", start.elapsed());

    Ok(ConfigureOutcome::Configured(ConfigureReport {
        facts,
        sizes,
        installed,
    }))
}
