// src/bin/shell-commands.rs

use anyhow::Result;
use clap::Parser;
use colored::*;
use shell_commands::cli::{Cli, dispatcher, handlers::commons::Session};

/// The main entry point of the `shell-commands` application.
/// It sets up logging, parses arguments, dispatches to the correct handler,
/// and performs centralized error handling.
#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    tokio::select! {
        result = run_cli(cli) => {
            if let Err(e) = result {
                eprintln!("\n{}: {:#}", "Error".red().bold(), e);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            // Same exit code a shell reports for an interrupted command.
            std::process::exit(130);
        }
    }
}

async fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);
    let session = Session::from_cli(&cli)?;
    dispatcher::dispatch(cli.args, &session).await
}
