// src/cli/handlers/list.rs

use anyhow::Result;
use clap::Parser;
use colored::*;
use serde::Serialize;

use super::commons::Session;
use crate::{
    core::{events::ShellCommandEvent, paths::display_path},
    models::ShellCommandEntry,
    system::shell::Platform,
};

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Lists the configured shell commands.")]
struct ListArgs {
    /// Print the list as JSON.
    #[arg(long)]
    json: bool,
}

/// One line of the listing, as it applies to the current platform.
#[derive(Serialize, Debug, PartialEq, Eq)]
struct CommandSummary<'a> {
    id: &'a str,
    alias: Option<&'a str>,
    command: Option<&'a str>,
    shell: Option<&'a str>,
    events: Vec<ShellCommandEvent>,
}

impl<'a> CommandSummary<'a> {
    fn new(entry: &'a ShellCommandEntry, platform: Platform) -> Self {
        Self {
            id: &entry.id,
            alias: entry.alias.as_deref(),
            command: entry.platform_commands.for_platform(platform),
            shell: entry.shells.for_platform(platform),
            events: entry.events.iter().copied().collect(),
        }
    }
}

pub async fn handle(args: Vec<String>, session: &Session) -> Result<()> {
    let list_args = ListArgs::try_parse_from(&args)?;
    let platform = Platform::current();
    let summaries: Vec<CommandSummary> = session
        .config
        .commands
        .iter()
        .map(|entry| CommandSummary::new(entry, platform))
        .collect();

    if list_args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!(
            "{}",
            format!(
                "No shell commands configured in '{}'.",
                display_path(&session.config_path)
            )
            .yellow()
        );
        return Ok(());
    }

    println!("\n--- {} ({}) ---", "Shell commands".bold(), platform);
    for summary in &summaries {
        let name = match summary.alias {
            Some(alias) => format!("{} {}", summary.id.cyan(), format!("({})", alias).dimmed()),
            None => summary.id.cyan().to_string(),
        };
        println!("  {}", name);
        match summary.command {
            Some(command) => println!("      {}", command.green()),
            None => println!("      {}", format!("no command for {}", platform).red()),
        }
        if let Some(shell) = summary.shell {
            println!("      {:<8} {}", "shell:".blue(), shell);
        }
        if !summary.events.is_empty() {
            let events: Vec<&str> = summary.events.iter().map(|e| e.as_str()).collect();
            println!("      {:<8} {}", "events:".blue(), events.join(", "));
        }
    }
    Ok(())
}
