//! mpiconf CLI - Probe the installed MPI and configure the bindings for it

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use mpiconf::error::{exit_code_for, find_configure_error};
use mpiconf::util::diagnostic::{emit, Diagnostic};
use mpiconf::util::Shell;

const RUN_VERBOSE: &str = "Run again with --verbose to see every toolchain command";

fn main() {
    let cli = Cli::parse();
    let shell = Shell::from_flags(cli.quiet, !cli.no_color, cli.json);

    if let Err(e) = run(&cli, &shell) {
        report_error(&e, &shell, cli.verbose);
        std::process::exit(exit_code_for(&e));
    }
}

fn run(cli: &Cli, shell: &Shell) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("mpiconf=debug")
    } else {
        EnvFilter::new("mpiconf=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    // Execute command
    match cli.command {
        None | Some(Commands::Configure) => commands::configure::execute(cli, shell),
        Some(Commands::Detect) => commands::detect::execute(cli, shell),
        Some(Commands::Sizes) => commands::sizes::execute(cli, shell),
    }
}

fn report_error(err: &anyhow::Error, shell: &Shell, verbose: bool) {
    if shell.is_json() {
        shell.error(format!("{:#}", err));
        return;
    }

    let Some(configure_error) = find_configure_error(err) else {
        eprintln!("error: {:#}", err);
        return;
    };

    let mut diag: Diagnostic = configure_error.to_diagnostic();
    let outer = err.to_string();
    if outer != configure_error.to_string() {
        diag = diag.with_context(outer);
    }
    if !verbose {
        diag = diag.with_suggestion(RUN_VERBOSE);
    }
    emit(&diag, shell.use_color());
}
