//! Fatal configuration errors and their exit codes.
//!
//! Every failure in the configure pipeline is fatal. The variants here are
//! the ones callers need to tell apart: they carry the context needed for an
//! actionable message and map to a process exit status.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::Diagnostic;

/// Exit status for recognition failures and invariant violations.
pub const EXIT_FAILURE: i32 = 1;

/// Error raised by a configure stage.
///
/// The `help` text of each variant is the remediation shown to the user.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ConfigureError {
    #[error("MPI implementation not recognized")]
    #[diagnostic(
        code(mpiconf::resolve::not_recognized),
        help("Check that `mpicc` on PATH (or $MPICC) is the wrapper of the MPI you want to use")
    )]
    NotRecognized { tried: Vec<String> },

    #[error("mpi.h header file not found")]
    #[diagnostic(
        code(mpiconf::header::not_found),
        help("Install the MPI development headers, or point $MPICC at a wrapper whose include path has mpi.h")
    )]
    HeaderNotFound { searched: Vec<PathBuf> },

    #[error("MPICH library is built statically")]
    #[diagnostic(
        code(mpiconf::linkage::static_only),
        help("Please install MPICH built as a shared library by configuring MPICH with the --enable-shared option")
    )]
    StaticOnlyLibrary,

    #[error("expected {expected} sizes from the size probe, found {found}")]
    #[diagnostic(
        code(mpiconf::sizes::count_mismatch),
        help("The size program must print one line each for int, long, long long and size_t")
    )]
    SizeCountMismatch { expected: usize, found: usize },

    #[error("malformed size probe output line: `{line}`")]
    #[diagnostic(
        code(mpiconf::sizes::malformed),
        help("Each line must read `sizeof(<type>) = <n>`")
    )]
    MalformedSizeOutput { line: String },

    #[error("`{command}` failed with {}", status_text(.code))]
    #[diagnostic(code(mpiconf::process::failed))]
    ProcessFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("`{command}` did not finish within {seconds}s")]
    #[diagnostic(
        code(mpiconf::process::timeout),
        help("Raise `toolchain.timeout_secs` or pass --timeout <secs> if the toolchain is just slow")
    )]
    Timeout { command: String, seconds: u64 },

    #[error("generator did not produce `{path}`")]
    #[diagnostic(code(mpiconf::generate::missing_output))]
    MissingGeneratedOutput { path: PathBuf },
}

impl ConfigureError {
    /// Process exit status for this error.
    ///
    /// External process failures surface the child's own status; a child
    /// killed by a signal has no status and maps to 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConfigureError::ProcessFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => EXIT_FAILURE,
        }
    }

    /// Remediation text from the `help` attribute, if the variant has one.
    pub fn remedy(&self) -> Option<String> {
        MietteDiagnostic::help(self).map(|help| help.to_string())
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = match self {
            ConfigureError::NotRecognized { tried } => {
                let diag = Diagnostic::error("Implementation not recognized.");
                if tried.is_empty() {
                    diag
                } else {
                    diag.with_context(format!("candidates tried: {}", tried.join(", ")))
                }
            }
            ConfigureError::HeaderNotFound { searched } => {
                let dirs: Vec<String> = searched.iter().map(|p| p.display().to_string()).collect();
                Diagnostic::error("mpi.h header file not found.")
                    .with_context(format!("Locations searched: [{}]", dirs.join(", ")))
            }
            ConfigureError::StaticOnlyLibrary => {
                Diagnostic::error("MPICH library is built statically.").with_context(
                    "libmpich links but libpmpich does not, so no shared MPICH is present",
                )
            }
            ConfigureError::ProcessFailed { stderr, .. } => {
                let mut diag = Diagnostic::error(self.to_string());
                for line in stderr.lines().filter(|l| !l.trim().is_empty()).take(20) {
                    diag = diag.with_context(line.to_string());
                }
                diag
            }
            ConfigureError::MissingGeneratedOutput { path } => Diagnostic::error(self.to_string())
                .with_location(path)
                .with_context("the placeholder source was left unchanged"),
            ConfigureError::SizeCountMismatch { .. }
            | ConfigureError::MalformedSizeOutput { .. }
            | ConfigureError::Timeout { .. } => Diagnostic::error(self.to_string()),
        };

        match self.remedy() {
            Some(help) => diag.with_suggestion(help),
            None => diag,
        }
    }
}

fn status_text(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// Find the [`ConfigureError`] behind an `anyhow` error chain, if any.
pub fn find_configure_error(err: &anyhow::Error) -> Option<&ConfigureError> {
    err.chain().find_map(|e| e.downcast_ref::<ConfigureError>())
}

/// Exit status for an arbitrary pipeline error.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    find_configure_error(err)
        .map(ConfigureError::exit_code)
        .unwrap_or(EXIT_FAILURE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_process_failure_propagates_exit_code() {
        let err = ConfigureError::ProcessFailed {
            command: "mpicc -show".to_string(),
            code: Some(7),
            stderr: String::new(),
        };
        assert_eq!(err.exit_code(), 7);

        let killed = ConfigureError::ProcessFailed {
            command: "mpicc -show".to_string(),
            code: None,
            stderr: String::new(),
        };
        assert_eq!(killed.exit_code(), 1);
    }

    #[test]
    fn test_recognition_failures_exit_one() {
        assert_eq!(ConfigureError::StaticOnlyLibrary.exit_code(), 1);
        assert_eq!(
            ConfigureError::HeaderNotFound { searched: vec![] }.exit_code(),
            1
        );
        assert_eq!(
            ConfigureError::NotRecognized { tried: vec![] }.exit_code(),
            1
        );
    }

    #[test]
    fn test_exit_code_through_context_chain() {
        let result: anyhow::Result<()> = Err(ConfigureError::ProcessFailed {
            command: "perl Unsafe.pl".to_string(),
            code: Some(3),
            stderr: String::new(),
        })
        .context("failed to run generator");

        let err = result.unwrap_err();
        assert_eq!(exit_code_for(&err), 3);
    }

    #[test]
    fn test_header_not_found_lists_directories() {
        let err = ConfigureError::HeaderNotFound {
            searched: vec![PathBuf::from("/opt/inc"), PathBuf::from("/usr/inc")],
        };
        let output = err.to_diagnostic().render(false);
        assert!(output.contains("mpi.h header file not found"));
        assert!(output.contains("/opt/inc, /usr/inc"));
    }

    #[test]
    fn test_static_only_has_remediation() {
        let output = ConfigureError::StaticOnlyLibrary.to_diagnostic().render(false);
        assert!(output.contains("built statically"));
        assert!(output.contains("--enable-shared"));
    }

    #[test]
    fn test_rendered_remedy_is_the_help_text() {
        let err = ConfigureError::StaticOnlyLibrary;
        let help = MietteDiagnostic::help(&err).unwrap().to_string();

        assert_eq!(err.to_diagnostic().suggestions, vec![help]);
    }

    #[test]
    fn test_each_remedy_appears_once() {
        let errors = [
            ConfigureError::NotRecognized {
                tried: vec!["mpich".to_string()],
            },
            ConfigureError::HeaderNotFound { searched: vec![] },
            ConfigureError::SizeCountMismatch {
                expected: 4,
                found: 3,
            },
            ConfigureError::MalformedSizeOutput {
                line: "garbage".to_string(),
            },
            ConfigureError::Timeout {
                command: "mpicc -show".to_string(),
                seconds: 1,
            },
        ];

        for err in &errors {
            let help = err.remedy().unwrap();
            let diag = err.to_diagnostic();
            assert_eq!(diag.suggestions, vec![help.clone()], "{:?}", err);
            assert_eq!(diag.render(false).matches(help.as_str()).count(), 1);
        }
    }

    #[test]
    fn test_process_failure_has_no_remedy() {
        let err = ConfigureError::ProcessFailed {
            command: "cc sizes.c".to_string(),
            code: Some(1),
            stderr: "sizes.c:1: error\n\n".to_string(),
        };
        let diag = err.to_diagnostic();
        assert!(diag.suggestions.is_empty());
        assert_eq!(diag.context, vec!["sizes.c:1: error"]);
    }
}
