//! Progress and error output for the command line.
//!
//! Status lines go to stderr with the verb right-aligned in a 12 column
//! gutter, the way cargo prints them. `--quiet` keeps only errors. `--json`
//! keeps stderr silent and reports errors as one JSON object on stdout, next
//! to the report the command prints there.

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::time::Duration;

/// Width of the verb column.
const GUTTER: usize = 12;

/// Verb printed in front of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Detected,
    Found,
    Installed,
    Finished,
    Probing,
    Generating,
    Info,
    Skipped,
    Error,
}

impl Status {
    fn verb(self) -> &'static str {
        match self {
            Status::Detected => "Detected",
            Status::Found => "Found",
            Status::Installed => "Installed",
            Status::Finished => "Finished",
            Status::Probing => "Probing",
            Status::Generating => "Generating",
            Status::Info => "Info",
            Status::Skipped => "Skipped",
            Status::Error => "error",
        }
    }

    /// ANSI color number: green for results, cyan for work in progress.
    fn color(self) -> u8 {
        match self {
            Status::Detected | Status::Found | Status::Installed | Status::Finished => 32,
            Status::Probing | Status::Generating => 36,
            Status::Info => 34,
            Status::Skipped => 33,
            Status::Error => 31,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Quiet,
    Json,
}

/// Where progress lines go.
#[derive(Debug)]
pub struct Shell {
    mode: Mode,
    color: bool,
}

impl Shell {
    /// Build from the global flags. `json` wins over `quiet`; color also
    /// needs stderr to be a terminal.
    pub fn from_flags(quiet: bool, color: bool, json: bool) -> Self {
        let mode = if json {
            Mode::Json
        } else if quiet {
            Mode::Quiet
        } else {
            Mode::Normal
        };
        Shell {
            mode,
            color: color && mode != Mode::Json && io::stderr().is_terminal(),
        }
    }

    /// A shell that prints nothing but errors.
    pub fn quiet() -> Self {
        Shell {
            mode: Mode::Quiet,
            color: false,
        }
    }

    pub fn is_json(&self) -> bool {
        self.mode == Mode::Json
    }

    pub fn use_color(&self) -> bool {
        self.color
    }

    /// Print `{verb:>12} {msg}` to stderr, unless the mode hides it.
    pub fn status(&self, status: Status, msg: impl Display) {
        let shown = match self.mode {
            Mode::Normal => true,
            Mode::Quiet => status == Status::Error,
            Mode::Json => false,
        };
        if shown {
            eprintln!("{} {}", self.gutter(status), msg);
        }
    }

    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    /// Report an error line, or a `{"reason":"error"}` object in JSON mode.
    pub fn error(&self, msg: impl Display) {
        if !self.is_json() {
            self.status(Status::Error, msg);
            return;
        }

        let event = serde_json::json!({
            "reason": "error",
            "message": msg.to_string(),
        });
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{}", event);
        let _ = out.flush();
    }

    /// Closing line of a run.
    pub fn finished(&self, what: impl Display, elapsed: Duration) {
        self.status(
            Status::Finished,
            format!("{} in {:.2}s", what, elapsed.as_secs_f64()),
        );
    }

    fn gutter(&self, status: Status) -> String {
        if self.color {
            format!(
                "\x1b[1;{}m{:>width$}\x1b[0m",
                status.color(),
                status.verb(),
                width = GUTTER
            )
        } else {
            format!("{:>width$}", status.verb(), width = GUTTER)
        }
    }
}
