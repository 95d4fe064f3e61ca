//! `mpiconf sizes` command

use anyhow::Result;

use crate::cli::Cli;
use mpiconf::ops::probe_sizes;
use mpiconf::util::Shell;

pub fn execute(cli: &Cli, shell: &Shell) -> Result<()> {
    let ctx = super::context(cli)?;
    let opts = ctx.configure_options(&cli.toolchain.overrides());

    let sizes = probe_sizes(&opts, shell)?;

    if !shell.is_json() {
        let [int, long, long_long, size_t] = sizes.as_array();
        println!("{} {} {} {}", int, long, long_long, size_t);
    }
    super::print_json(shell, &sizes)
}
