//! `mpiconf detect` command

use anyhow::Result;

use crate::cli::Cli;
use mpiconf::ops::detect;
use mpiconf::util::Shell;

pub fn execute(cli: &Cli, shell: &Shell) -> Result<()> {
    let ctx = super::context(cli)?;
    let opts = ctx.configure_options(&cli.toolchain.overrides());

    let facts = detect(&opts, shell)?;

    if !shell.is_json() {
        println!("{}", facts.implementation.kind);
        println!("{}", facts.header.display());
    }
    super::print_json(shell, &facts)
}
