//! `mpiconf configure` command

use anyhow::Result;

use crate::cli::Cli;
use mpiconf::ops::{configure, ConfigureOutcome, PlatformSupport};
use mpiconf::util::Shell;

pub fn execute(cli: &Cli, shell: &Shell) -> Result<()> {
    let ctx = super::context(cli)?;
    let opts = ctx.configure_options(&cli.toolchain.overrides());

    match configure(&opts, PlatformSupport::host(), shell)? {
        ConfigureOutcome::NotRequired => super::print_json(
            shell,
            &serde_json::json!({ "configured": false, "reason": "native MPI ABI" }),
        ),
        ConfigureOutcome::Configured(report) => {
            if !shell.is_json() && report.installed.is_none() {
                // --no-generate: the facts are the output
                println!("implementation: {}", report.facts.implementation.kind);
                println!("header: {}", report.facts.header.display());
                println!("bridge: {}", report.facts.bridge.needs_bridge_layer);
                println!("link flags: {}", report.facts.link_flags);
                println!("sizes: {}", report.sizes);
            }
            super::print_json(shell, &report)
        }
    }
}
