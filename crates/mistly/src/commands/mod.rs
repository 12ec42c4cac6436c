//! Command dispatch: bridges CLI args to workflow runs and output.

pub mod config_cmd;
pub mod plan;
pub mod provision;

use clap::CommandFactory;

use crate::cli::{Cli, Command, CompletionsArgs, GlobalOpts};
use crate::error::CliError;

/// Dispatch a parsed command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Provision(args) => provision::handle(args, global).await,
        Command::Plan(args) => plan::handle(args, global).await,
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completions(args) => {
            completions(&args);
            Ok(())
        }
    }
}

/// Write shell completions to stdout.
fn completions(args: &CompletionsArgs) {
    let mut cmd = Cli::command();
    clap_complete::generate(args.shell, &mut cmd, "mistly", &mut std::io::stdout());
}
