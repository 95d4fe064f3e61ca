//! Trial compilation against the MPI compiler wrapper.
//!
//! A probe writes a tiny C program, runs the compiler on it and reports only
//! whether the compiler exited successfully. Why it failed (missing header,
//! `#error`, unresolved symbol) is never interpreted; the compiler's output is
//! kept for debug logging only.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::util::fs::write_string;
use crate::util::process::{absolute_program, ProcessBuilder};

/// Result of one probe invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Whether the compiler exited with status 0
    pub success: bool,
    /// Captured compiler output
    pub diagnostics: String,
}

impl ProbeOutcome {
    /// A passing outcome.
    pub fn passed(diagnostics: impl Into<String>) -> Self {
        ProbeOutcome {
            success: true,
            diagnostics: diagnostics.into(),
        }
    }

    /// A failing outcome.
    pub fn failed(diagnostics: impl Into<String>) -> Self {
        ProbeOutcome {
            success: false,
            diagnostics: diagnostics.into(),
        }
    }
}

/// Something that can answer compile and link questions.
///
/// Errors are reserved for failing to run the compiler at all; a compiler
/// that runs and rejects the program is a failed [`ProbeOutcome`].
pub trait Probe {
    /// Does `fragment`, followed by an empty `main`, compile?
    fn try_compile(&self, fragment: &str) -> Result<ProbeOutcome>;

    /// Does a program calling `function` link against `library`?
    fn check_lib(&self, library: &str, function: &str) -> Result<ProbeOutcome>;
}

/// Probe backed by a real compiler executable.
#[derive(Debug, Clone)]
pub struct CompilerProbe {
    compiler: PathBuf,
    timeout: Option<Duration>,
}

impl CompilerProbe {
    /// Create a probe for the given compiler.
    ///
    /// Probes run inside a scratch directory, so a relative compiler path is
    /// anchored to the current directory here.
    pub fn new(compiler: impl Into<PathBuf>) -> Self {
        CompilerProbe {
            compiler: absolute_program(&compiler.into()),
            timeout: None,
        }
    }

    /// Bound each compiler run.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Compile `source` in a fresh scratch directory.
    ///
    /// Each call gets its own directory, removed when the call returns, so no
    /// probe ever sees another probe's source or output.
    fn run(&self, source: &str, extra_args: &[String]) -> Result<ProbeOutcome> {
        let scratch = tempfile::Builder::new()
            .prefix("mpiconf-probe-")
            .tempdir()
            .context("failed to create probe scratch directory")?;
        let src = scratch.path().join("conftest.c");
        let out = scratch.path().join("conftest");
        write_string(&src, source)?;

        let output = ProcessBuilder::new(&self.compiler)
            .arg(&src)
            .arg("-o")
            .arg(&out)
            .args(extra_args)
            .cwd(scratch.path())
            .timeout(self.timeout)
            .exec()?;

        let mut diagnostics = String::from_utf8_lossy(&output.stdout).into_owned();
        diagnostics.push_str(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            Ok(ProbeOutcome::passed(diagnostics))
        } else {
            Ok(ProbeOutcome::failed(diagnostics))
        }
    }
}

impl Probe for CompilerProbe {
    fn try_compile(&self, fragment: &str) -> Result<ProbeOutcome> {
        let outcome = self.run(&compile_test_source(fragment), &[])?;
        tracing::debug!("try_compile -> {}", outcome.success);
        Ok(outcome)
    }

    fn check_lib(&self, library: &str, function: &str) -> Result<ProbeOutcome> {
        let outcome = self.run(&link_test_source(function), &[format!("-l{}", library)])?;
        tracing::debug!("check_lib({}, {}) -> {}", library, function, outcome.success);
        Ok(outcome)
    }
}

/// Source for a compile probe: the fragment plus a no-op entry point.
pub fn compile_test_source(fragment: &str) -> String {
    format!("{}\nint main(void) {{ return 0; }}\n", fragment)
}

/// Source for a link probe calling `function`.
///
/// The function is declared with a dummy prototype, as autoconf does, so the
/// program compiles without the library's headers and only linking can fail.
pub fn link_test_source(function: &str) -> String {
    format!(
        "char {func}(void);\nint main(void) {{ return (int) {func}(); }}\n",
        func = function
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_test_source_appends_main() {
        let source = compile_test_source("#include <mpi.h>");
        assert!(source.starts_with("#include <mpi.h>\n"));
        assert!(source.contains("int main(void)"));
    }

    #[test]
    fn test_link_test_source_calls_function() {
        let source = link_test_source("PMPI_Init");
        assert!(source.contains("char PMPI_Init(void);"));
        assert!(source.contains("PMPI_Init()"));
    }

    #[cfg(unix)]
    #[test]
    fn test_outcome_follows_exit_status() {
        let ok = CompilerProbe::new("true").try_compile("int x;").unwrap();
        assert!(ok.success);

        let rejected = CompilerProbe::new("false").check_lib("mpich", "MPI_Init").unwrap();
        assert!(!rejected.success);
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_passes_library_flag() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let compiler = tmp.path().join("fakecc");
        std::fs::write(
            &compiler,
            "#!/bin/sh\nfor a in \"$@\"; do [ \"$a\" = \"-lpmpich\" ] && exit 0; done\nexit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&compiler, std::fs::Permissions::from_mode(0o755)).unwrap();

        let probe = CompilerProbe::new(&compiler);
        assert!(probe.check_lib("pmpich", "MPI_Init").unwrap().success);
        assert!(!probe.check_lib("mpich", "PMPI_Init").unwrap().success);
    }

    #[cfg(unix)]
    #[test]
    fn test_relative_compiler_path_survives_scratch_dir() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::Builder::new()
            .prefix("mpiconf-relcc-")
            .tempdir_in(".")
            .unwrap();
        let compiler = dir.path().join("fakecc");
        std::fs::write(&compiler, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&compiler, std::fs::Permissions::from_mode(0o755)).unwrap();

        let relative = std::path::Path::new(".")
            .join(dir.path().file_name().unwrap())
            .join("fakecc");
        let outcome = CompilerProbe::new(&relative).try_compile("int x;").unwrap();

        assert!(outcome.success);
    }

    #[test]
    fn test_missing_compiler_is_an_error() {
        let probe = CompilerProbe::new("/nonexistent/mpiconf-cc");
        assert!(probe.try_compile("int x;").is_err());
    }
}
