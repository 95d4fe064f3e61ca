//! Command implementations

pub mod configure;
pub mod detect;
pub mod sizes;

use anyhow::Result;
use serde::Serialize;

use crate::cli::Cli;
use mpiconf::util::context::GlobalContext;
use mpiconf::util::Shell;

/// Load the context named by the global flags.
pub fn context(cli: &Cli) -> Result<GlobalContext> {
    GlobalContext::new(cli.work_dir.clone(), cli.config.as_deref())
}

/// Print a report on stdout when in JSON mode.
pub fn print_json<T: Serialize>(shell: &Shell, report: &T) -> Result<()> {
    if shell.is_json() {
        println!("{}", serde_json::to_string_pretty(report)?);
    }
    Ok(())
}
