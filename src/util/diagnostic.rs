//! Terminal rendering of fatal errors.
//!
//! ```text
//! error: mpi.h header file not found.
//!   --> /opt/mpi/include
//!    = searched: /opt/inc, /usr/inc
//!   help: Install the MPI development headers
//! ```

use std::fmt;
use std::path::PathBuf;

/// An error message with the facts behind it and what to do next.
#[derive(Debug, Clone, Default)]
pub struct Diagnostic {
    pub message: String,
    /// File the error is about
    pub location: Option<PathBuf>,
    /// One line per fact
    pub context: Vec<String>,
    /// One line per remedy, in the order added
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Render for stderr, with ANSI colors when `color` is set.
    pub fn render(&self, color: bool) -> String {
        let paint = |code: &str, text: &str| {
            if color {
                format!("\x1b[1;{}m{}\x1b[0m", code, text)
            } else {
                text.to_string()
            }
        };

        let mut lines = vec![format!("{}: {}", paint("31", "error"), self.message)];
        if let Some(path) = &self.location {
            lines.push(format!("  --> {}", path.display()));
        }
        lines.extend(self.context.iter().map(|c| format!("   = {}", c)));
        lines.extend(
            self.suggestions
                .iter()
                .map(|s| format!("  {}: {}", paint("32", "help"), s)),
        );

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.render(color));
}
