//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use mpiconf::util::context::Overrides;

/// mpiconf - Probe the installed MPI and configure the bindings for it
#[derive(Parser)]
#[command(name = "mpiconf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Print every probe command
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Print errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Print a JSON report on stdout instead of status lines
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file to use instead of ~/.mpiconf/config.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding the sources to configure (defaults to current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    #[command(flatten)]
    pub toolchain: ToolchainArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Probe MPI and generate the customized sources (default)
    Configure,

    /// Identify the MPI implementation and locate mpi.h
    Detect,

    /// Print the byte widths of int, long, long long and size_t
    Sizes,
}

/// Toolchain selection. Accepted before or after the subcommand.
#[derive(Args, Clone, Debug, Default)]
pub struct ToolchainArgs {
    /// MPI compiler wrapper (overrides $MPICC and config)
    #[arg(long, global = true, value_name = "PROGRAM")]
    pub wrapper: Option<PathBuf>,

    /// Host C compiler for the size probe (overrides $CC and config)
    #[arg(long, global = true, value_name = "PROGRAM")]
    pub cc: Option<PathBuf>,

    /// Bound on each external process in seconds; 0 disables it
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Stop after probing and print the facts instead of generating
    #[arg(long, global = true)]
    pub no_generate: bool,
}

impl ToolchainArgs {
    /// Command-line values, which beat environment and config.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            wrapper: self.wrapper.clone(),
            cc: self.cc.clone(),
            timeout_secs: self.timeout,
            no_generate: self.no_generate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_bare_invocation_configures() {
        let cli = Cli::parse_from(["mpiconf", "--wrapper", "/opt/mpi/bin/mpicc"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.toolchain.wrapper, Some(PathBuf::from("/opt/mpi/bin/mpicc")));
    }

    #[test]
    fn test_flags_before_subcommand_are_honored() {
        let cli = Cli::parse_from(["mpiconf", "--no-generate", "--wrapper", "/x/mpicc", "configure"]);
        assert_eq!(cli.command, Some(Commands::Configure));

        let overrides = cli.toolchain.overrides();
        assert!(overrides.no_generate);
        assert_eq!(overrides.wrapper, Some(PathBuf::from("/x/mpicc")));
    }

    #[test]
    fn test_flag_position_does_not_matter() {
        let before = Cli::parse_from(["mpiconf", "--wrapper", "/x/mpicc", "--timeout", "5", "detect"]);
        let after = Cli::parse_from(["mpiconf", "detect", "--wrapper", "/x/mpicc", "--timeout", "5"]);

        for cli in [before, after] {
            assert_eq!(cli.command, Some(Commands::Detect));
            assert_eq!(cli.toolchain.wrapper, Some(PathBuf::from("/x/mpicc")));
            assert_eq!(cli.toolchain.timeout, Some(5));
        }
    }

    #[test]
    fn test_subcommand_flags() {
        let cli = Cli::parse_from(["mpiconf", "configure", "--no-generate", "--timeout", "0", "--json"]);
        assert_eq!(cli.command, Some(Commands::Configure));
        assert!(cli.toolchain.no_generate);
        assert_eq!(cli.toolchain.timeout, Some(0));
        assert!(cli.json);
    }
}
