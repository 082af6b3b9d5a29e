// src/cli/handlers/trigger.rs

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::PathBuf;

use super::commons::Session;
use crate::core::events::{self, EventData, ShellCommandEvent};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Simulates an event and runs every shell command enabled for it."
)]
struct TriggerArgs {
    /// The event, e.g. `startup` or `file-created`.
    event: String,

    /// The affected file or folder, relative to the vault root.
    path: Option<PathBuf>,

    /// For renames: the path before the rename.
    #[arg(long)]
    old_path: Option<PathBuf>,
}

pub async fn handle(args: Vec<String>, session: &Session) -> Result<()> {
    // 1. Parse and validate the event.
    let trigger_args = TriggerArgs::try_parse_from(&args)?;
    let event: ShellCommandEvent = trigger_args.event.parse()?;
    let data = EventData::new(event, trigger_args.path, trigger_args.old_path)
        .with_context(|| format!("Cannot trigger '{}'", event))?;

    // 2. Run the enabled commands.
    let runner = session.runner()?;
    let outcomes = events::trigger_event(&runner, data).await;
    if outcomes.is_empty() {
        println!("{}", format!("No shell command is enabled for '{}'.", event).yellow());
        return Ok(());
    }

    // 3. Summarize. Pre-execution errors are not reported anywhere else.
    for (id, outcome) in outcomes {
        match outcome {
            Ok(report) => println!(
                "  {} {} ({:?})",
                "✓".green(),
                id.cyan(),
                report.outcome
            ),
            Err(e) if e.is_silent() => println!("  {} {} (cancelled)", "-".dimmed(), id.cyan()),
            Err(e) => println!("  {} {}: {}", "✗".red(), id.cyan(), e),
        }
    }
    Ok(())
}
