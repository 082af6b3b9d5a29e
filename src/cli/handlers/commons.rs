// src/cli/handlers/commons.rs

// Shared state and helpers used by multiple handlers.

use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    cli::Cli,
    core::{
        config_loader,
        paths::{self, display_path},
        runner::{RunError, ShellCommandRunner},
        variables::custom,
    },
    host::terminal::TerminalHost,
    models::ShellCommandsConfig,
};

/// Everything a handler needs: the loaded configuration and the terminal host.
#[derive(Debug)]
pub struct Session {
    pub config: Arc<ShellCommandsConfig>,
    /// Where the configuration was read from, or would have been.
    pub config_path: PathBuf,
    pub host: Arc<TerminalHost>,
    /// `--set` assignments, applied on top of the configured initial values.
    pub assignments: Vec<String>,
}

impl Session {
    /// Loads the configuration and builds the host from the global flags.
    ///
    /// A missing configuration file at the default location is not an error:
    /// the session then simply has no commands.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        // 1. Configuration
        let (config_path, explicit) = match &cli.config {
            Some(path) => (path.clone(), true),
            None => (paths::get_default_config_path()?, false),
        };
        let config = if !explicit && !config_path.exists() {
            log::warn!(
                "No configuration file at '{}'; starting without commands.",
                config_path.display()
            );
            ShellCommandsConfig::default()
        } else {
            config_loader::load_config(&config_path)?
        };

        // 2. Vault and editor state
        let vault = dunce::canonicalize(&cli.vault)
            .with_context(|| format!("Vault directory '{}' not found", cli.vault.display()))?;
        let active_file = cli
            .file
            .as_deref()
            .map(|file| vault_relative(&vault, file))
            .transpose()?;
        if let Some(file) = &active_file
            && !vault.join(file).is_file()
        {
            log::warn!("File '{}' does not exist; running without an active file.", file.display());
        }

        let host = TerminalHost::new(vault)
            .with_active_file(active_file)
            .with_selection(cli.selection.clone())
            .with_caret(cli.caret)
            .with_workspace(cli.workspace.clone())
            .assume_yes(cli.yes);

        Ok(Self {
            config: Arc::new(config),
            config_path,
            host: Arc::new(host),
            assignments: cli.set.clone(),
        })
    }

    /// A runner over this session's configuration, with `--set` values applied.
    pub fn runner(&self) -> Result<ShellCommandRunner> {
        let mut values = custom::initial_values(&self.config);
        custom::apply_assignments(&self.config, &mut values, &self.assignments)?;
        let runner = ShellCommandRunner::new(self.config.clone(), self.host.clone())?;
        Ok(runner.with_custom_values(values))
    }
}

/// Turns a `--file` argument into a path relative to the vault root.
fn vault_relative(vault: &Path, file: &Path) -> Result<PathBuf> {
    if file.is_relative() {
        return Ok(file.to_path_buf());
    }
    let file = dunce::simplified(file);
    file.strip_prefix(vault)
        .map(Path::to_path_buf)
        .map_err(|_| {
            anyhow!(
                "File '{}' is not inside the vault '{}'.",
                file.display(),
                display_path(vault)
            )
        })
}

/// Converts a runner error into the handler's result. Cancellations the user
/// asked for end quietly.
pub fn finish_run<T>(result: Result<T, RunError>, command: &str) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_silent() => {
            log::debug!("'{}' ended without running: {}", command, e);
            if matches!(e, RunError::Declined { .. }) {
                println!("{}", "Operation cancelled.".dimmed());
            }
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| format!("Shell command '{}' did not run", command)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vault_relative() {
        let vault = Path::new("/notes");
        assert_eq!(
            vault_relative(vault, Path::new("daily/today.md")).unwrap(),
            PathBuf::from("daily/today.md")
        );
        #[cfg(unix)]
        {
            assert_eq!(
                vault_relative(vault, Path::new("/notes/a.md")).unwrap(),
                PathBuf::from("a.md")
            );
            assert!(vault_relative(vault, Path::new("/elsewhere/a.md")).is_err());
        }
    }

    #[test]
    fn test_finish_run_swallows_silent_errors() {
        let declined: Result<(), RunError> = Err(RunError::Declined { id: "x".to_string() });
        assert!(finish_run(declined, "x").unwrap().is_none());

        let unknown: Result<(), RunError> = Err(RunError::UnknownCommand("x".to_string()));
        assert!(finish_run(unknown, "x").is_err());
    }
}
