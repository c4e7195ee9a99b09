//! ingress-ssh — SSH to EC2 through a temporary, caller-scoped ingress rule

use std::process::ExitCode;

use clap::Parser;
use ingress_ssh::cli::Cli;
use ingress_ssh::domain::exit_code;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version come through here too.
            return if e.use_stderr() {
                ExitCode::from(exit_code::USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    ingress_ssh::logging::init(cli.verbose);
    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_code::USAGE)
        }
    }
}
