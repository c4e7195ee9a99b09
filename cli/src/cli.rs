//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::app::{AppContext, OutputFlags};
use crate::commands;

const EXIT_CODES: &str = "\
Exit codes:
  0    session completed and access revoked
  1    usage or configuration error
  10   caller address or target could not be resolved
  11   ingress rule could not be authorized
  12   ssh failed or exited non-zero (access revoked)
  13   access could not be revoked after a successful session
  14   ssh failed and access could not be revoked
  130  interrupted by a signal (access revoked)";

/// Open SSH to an EC2 instance through a temporary, caller-scoped ingress rule
#[derive(Parser)]
#[command(
    name = "ingress-ssh",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true,
    after_help = EXIT_CODES
)]
pub struct Cli {
    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Authorize your address, run ssh, then revoke the rule
    Connect(commands::connect::ConnectArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails before it can map the failure to
    /// its own exit code.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            quiet,
            no_color,
            command,
            ..
        } = self;
        let app = AppContext::new(&OutputFlags { no_color, quiet });
        match command {
            Command::Connect(args) => commands::connect::run(&app, args).await,
            Command::Config(cmd) => commands::config::run(&app, cmd),
            Command::Version => {
                commands::version::run();
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}
