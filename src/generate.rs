//! Hand the discovered facts to the bridge generator.
//!
//! The generator reads the placeholder source, writes the customized source
//! and the C bridge, and exits. Its output is installed over the placeholder
//! only after the generator succeeded and the output was verified; until then
//! the placeholder is untouched.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::sizes::SizeSet;
use crate::util::fs::{replace_file, resolve_in};
use crate::util::process::ProcessBuilder;

/// Default generator program.
pub const DEFAULT_GENERATOR: &str = "perl";

/// Default generator script.
pub const DEFAULT_GENERATOR_SCRIPT: &str = "Unsafe.pl";

/// Names of the files the generator reads and writes, relative to the work
/// directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandoffFiles {
    /// Source replaced by the generator output
    pub placeholder: PathBuf,
    /// Generator output, installed over the placeholder
    pub generated: PathBuf,
    /// Generated C bridge source
    pub bridge: PathBuf,
}

impl Default for HandoffFiles {
    fn default() -> Self {
        HandoffFiles {
            placeholder: PathBuf::from("Unsafe.cs"),
            generated: PathBuf::from("CustomUnsafe.cs"),
            bridge: PathBuf::from("cbridge.c"),
        }
    }
}

/// How to invoke the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorCommand {
    pub program: PathBuf,
    /// Arguments placed before the positional facts
    pub args: Vec<String>,
}

impl Default for GeneratorCommand {
    fn default() -> Self {
        GeneratorCommand {
            program: PathBuf::from(DEFAULT_GENERATOR),
            args: vec![DEFAULT_GENERATOR_SCRIPT.to_string()],
        }
    }
}

impl GeneratorCommand {
    /// Full argument list: leading args, header, file names, then sizes.
    pub fn arguments(&self, header: &Path, files: &HandoffFiles, sizes: &SizeSet) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(header.display().to_string());
        args.push(files.placeholder.display().to_string());
        args.push(files.generated.display().to_string());
        args.push(files.bridge.display().to_string());
        args.extend(sizes.as_array().iter().map(|s| s.to_string()));
        args
    }
}

/// Files left in place by a successful handoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledFiles {
    pub source: PathBuf,
    pub bridge: PathBuf,
}

/// Runs the generator and installs its output.
#[derive(Debug, Clone)]
pub struct Handoff {
    work_dir: PathBuf,
    command: GeneratorCommand,
    files: HandoffFiles,
    timeout: Option<Duration>,
}

impl Handoff {
    pub fn new(work_dir: impl Into<PathBuf>, command: GeneratorCommand, files: HandoffFiles) -> Self {
        Handoff {
            work_dir: work_dir.into(),
            command,
            files,
            timeout: None,
        }
    }

    /// Bound the generator run.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The command line the generator will be run with.
    pub fn display_command(&self, header: &Path, sizes: &SizeSet) -> String {
        self.builder(header, sizes).display_command()
    }

    fn builder(&self, header: &Path, sizes: &SizeSet) -> ProcessBuilder {
        ProcessBuilder::new(&self.command.program)
            .args(self.command.arguments(header, &self.files, sizes))
            .cwd(&self.work_dir)
            .timeout(self.timeout)
    }

    /// Run the generator, then move its output over the placeholder.
    pub fn run(&self, header: &Path, sizes: &SizeSet) -> Result<InstalledFiles> {
        let placeholder = resolve_in(&self.work_dir, &self.files.placeholder);
        let generated = resolve_in(&self.work_dir, &self.files.generated);
        let bridge = resolve_in(&self.work_dir, &self.files.bridge);

        // Output left over from an earlier run must not pass verification.
        if generated.is_file() {
            std::fs::remove_file(&generated).with_context(|| {
                format!("failed to remove stale output: {}", generated.display())
            })?;
        }

        self.builder(header, sizes)
            .exec_and_check()
            .context("bridge generator failed; placeholder left unchanged")?;

        replace_file(&generated, &placeholder)?;

        Ok(InstalledFiles {
            source: placeholder,
            bridge,
        })
    }
}
