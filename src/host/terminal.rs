// src/host/terminal.rs

use super::{CaretPosition, Host, SinkError};
use arboard::Clipboard;
use async_trait::async_trait;
use colored::Colorize;
use dialoguer::{Confirm, theme::ColorfulTheme};
use std::path::{Path, PathBuf};

/// The host used by the command line: the "editor state" (active file, caret,
/// selection) is whatever the user passed as flags, notices go to the terminal
/// and files are edited on disk.
#[derive(Debug, Clone)]
pub struct TerminalHost {
    vault: PathBuf,
    active_file: Option<PathBuf>,
    selection: Option<String>,
    caret: Option<CaretPosition>,
    workspace: Option<String>,
    assume_yes: bool,
}

impl TerminalHost {
    pub fn new(vault: PathBuf) -> Self {
        Self {
            vault,
            active_file: None,
            selection: None,
            caret: None,
            workspace: None,
            assume_yes: false,
        }
    }

    /// `file` is relative to the vault root.
    pub fn with_active_file(mut self, file: Option<PathBuf>) -> Self {
        self.active_file = file;
        self
    }

    pub fn with_selection(mut self, selection: Option<String>) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_caret(mut self, caret: Option<CaretPosition>) -> Self {
        self.caret = caret;
        self
    }

    pub fn with_workspace(mut self, workspace: Option<String>) -> Self {
        self.workspace = workspace;
        self
    }

    /// Answer every confirmation prompt with yes.
    pub fn assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    /// The active file counts as open only while it exists in the vault.
    fn absolute_active_file(&self) -> Option<PathBuf> {
        self.active_file
            .as_ref()
            .map(|f| self.vault.join(f))
            .filter(|path| path.is_file())
    }
}

#[async_trait]
impl Host for TerminalHost {
    fn vault_path(&self) -> &Path {
        &self.vault
    }

    fn active_file(&self) -> Option<PathBuf> {
        self.absolute_active_file()?;
        self.active_file.clone()
    }

    async fn active_file_content(&self) -> Option<String> {
        let path = self.absolute_active_file()?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Some(content),
            Err(e) => {
                log::debug!("Could not read active file '{}': {}", path.display(), e);
                None
            }
        }
    }

    async fn write_active_file(&self, content: &str) -> Result<(), SinkError> {
        let path = self.absolute_active_file().ok_or(SinkError::NoActiveFile)?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|source| SinkError::Io { path, source })
    }

    fn selection(&self) -> Option<String> {
        self.selection.clone()
    }

    fn caret(&self) -> Option<CaretPosition> {
        self.caret
    }

    fn workspace_name(&self) -> Option<String> {
        self.workspace.clone()
    }

    async fn read_clipboard(&self) -> Option<String> {
        let text = tokio::task::spawn_blocking(|| Clipboard::new()?.get_text())
            .await
            .ok()?;
        match text {
            Ok(text) => Some(text),
            Err(e) => {
                log::debug!("Clipboard unavailable: {}", e);
                None
            }
        }
    }

    async fn write_clipboard(&self, text: &str) -> Result<(), SinkError> {
        let text = text.to_string();
        tokio::task::spawn_blocking(move || Clipboard::new()?.set_text(text))
            .await
            .map_err(|e| SinkError::Clipboard(e.to_string()))?
            .map_err(|e| SinkError::Clipboard(e.to_string()))
    }

    async fn notify(&self, message: &str) {
        println!("{}", message);
    }

    async fn notify_error(&self, message: &str) {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }

    async fn set_status_bar(&self, text: &str) {
        println!("{} {}", "[status]".dimmed(), text);
    }

    async fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        let prompt = prompt.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .default(false)
                .interact()
        })
        .await;
        match answer {
            Ok(Ok(answer)) => answer,
            Ok(Err(e)) => {
                log::warn!("Confirmation prompt failed: {}", e);
                false
            }
            Err(e) => {
                log::warn!("Confirmation prompt task failed: {}", e);
                false
            }
        }
    }
}
