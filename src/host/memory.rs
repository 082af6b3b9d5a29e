// src/host/memory.rs

use super::{CaretPosition, Host, SinkError};
use async_trait::async_trait;
use std::{
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

/// Something a [`MemoryHost`] was asked to show or ask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Notice(String),
    Error(String),
    StatusBar(String),
    Confirm(String),
}

#[derive(Debug, Default)]
struct MemoryState {
    file_content: Option<String>,
    clipboard: Option<String>,
    events: Vec<HostEvent>,
}

/// An editor that lives entirely in memory. Useful for embedding and for tests:
/// every notice, status update and confirmation prompt is recorded.
#[derive(Debug)]
pub struct MemoryHost {
    vault: PathBuf,
    active_file: Option<PathBuf>,
    selection: Option<String>,
    caret: Option<CaretPosition>,
    workspace: Option<String>,
    confirm_answer: bool,
    state: Mutex<MemoryState>,
}

impl MemoryHost {
    pub fn new(vault: impl Into<PathBuf>) -> Self {
        Self {
            vault: vault.into(),
            active_file: None,
            selection: None,
            caret: None,
            workspace: None,
            confirm_answer: true,
            state: Mutex::new(MemoryState::default()),
        }
    }

    pub fn with_active_file(mut self, path: impl Into<PathBuf>, content: &str) -> Self {
        self.active_file = Some(path.into());
        self.state_mut().file_content = Some(content.to_string());
        self
    }

    pub fn with_selection(mut self, selection: &str) -> Self {
        self.selection = Some(selection.to_string());
        self
    }

    pub fn with_caret(mut self, line: usize, column: usize) -> Self {
        self.caret = Some(CaretPosition { line, column });
        self
    }

    pub fn with_clipboard(self, text: &str) -> Self {
        self.state_mut().clipboard = Some(text.to_string());
        self
    }

    pub fn with_workspace(mut self, name: &str) -> Self {
        self.workspace = Some(name.to_string());
        self
    }

    /// The answer every confirmation prompt gets.
    pub fn with_confirm_answer(mut self, answer: bool) -> Self {
        self.confirm_answer = answer;
        self
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.state_mut().events.clone()
    }

    pub fn file_content(&self) -> Option<String> {
        self.state_mut().file_content.clone()
    }

    pub fn clipboard(&self) -> Option<String> {
        self.state_mut().clipboard.clone()
    }

    fn record(&self, event: HostEvent) {
        self.state_mut().events.push(event);
    }

    fn state_mut(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Host for MemoryHost {
    fn vault_path(&self) -> &Path {
        &self.vault
    }

    fn active_file(&self) -> Option<PathBuf> {
        self.active_file.clone()
    }

    async fn active_file_content(&self) -> Option<String> {
        self.active_file.as_ref()?;
        self.state_mut().file_content.clone()
    }

    async fn write_active_file(&self, content: &str) -> Result<(), SinkError> {
        if self.active_file.is_none() {
            return Err(SinkError::NoActiveFile);
        }
        self.state_mut().file_content = Some(content.to_string());
        Ok(())
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
        self.state_mut().clipboard.clone()
    }

    async fn write_clipboard(&self, text: &str) -> Result<(), SinkError> {
        self.state_mut().clipboard = Some(text.to_string());
        Ok(())
    }

    async fn notify(&self, message: &str) {
        self.record(HostEvent::Notice(message.to_string()));
    }

    async fn notify_error(&self, message: &str) {
        self.record(HostEvent::Error(message.to_string()));
    }

    async fn set_status_bar(&self, text: &str) {
        self.record(HostEvent::StatusBar(text.to_string()));
    }

    async fn confirm(&self, prompt: &str) -> bool {
        self.record(HostEvent::Confirm(prompt.to_string()));
        self.confirm_answer
    }
}
