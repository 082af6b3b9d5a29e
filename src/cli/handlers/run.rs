// src/cli/handlers/run.rs

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use super::commons::{self, Session};
use crate::{core::runner::RunTrigger, system::executor::ExecutionOutcome};

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Runs a shell command by id or alias.")]
struct RunArgs {
    /// The id or alias of the shell command.
    command: String,

    /// Print the composed command before running it.
    #[arg(long, short)]
    verbose: bool,
}

/// The main handler for the `run` command.
pub async fn handle(args: Vec<String>, session: &Session) -> Result<()> {
    // 1. Parse this handler's specific arguments.
    let run_args = RunArgs::try_parse_from(&args)?;

    // 2. Find the command.
    let runner = session.runner()?;
    let entry = runner.find(&run_args.command)?;

    // 3. Run it. Output goes to the configured channels.
    let Some(report) = commons::finish_run(
        runner.run(entry, &RunTrigger::manual()).await,
        &run_args.command,
    )?
    else {
        return Ok(());
    };

    if run_args.verbose {
        println!("\n> {}", report.prepared.command.green());
    }
    if report.outcome == ExecutionOutcome::Failed {
        log::debug!(
            "'{}' failed with exit code {:?}",
            entry.id,
            report.result.exit_code
        );
    }
    Ok(())
}
