// src/cli/handlers/preview.rs

use anyhow::Result;
use clap::Parser;
use colored::*;

use super::commons::{self, Session};
use crate::core::{paths::display_path, runner::RunTrigger};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Shows the command that would run, with every variable resolved, without running it."
)]
struct PreviewArgs {
    /// The id or alias of the shell command.
    command: String,
}

pub async fn handle(args: Vec<String>, session: &Session) -> Result<()> {
    let preview_args = PreviewArgs::try_parse_from(&args)?;
    let runner = session.runner()?;
    let entry = runner.find(&preview_args.command)?;

    let Some(prepared) = commons::finish_run(
        runner.prepare(entry, &RunTrigger::manual()).await,
        &preview_args.command,
    )?
    else {
        return Ok(());
    };

    println!("\n--- {} '{}' ---", "Shell command".bold(), entry.display_name().yellow());
    println!("  {:<12} {}", "Platform:".blue(), runner.platform());
    println!("  {:<12} {}", "Shell:".blue(), prepared.shell.name);
    println!(
        "  {:<12} {} {}",
        "Invocation:".blue(),
        prepared.shell.path.display(),
        prepared.shell.args.join(" ")
    );
    println!(
        "  {:<12} {}",
        "Directory:".blue(),
        display_path(&prepared.working_directory)
    );
    if entry.confirm_execution {
        println!("  {:<12} {}", "Confirm:".blue(), "yes".yellow());
    }
    println!("\n> {}", prepared.command.green());
    Ok(())
}
