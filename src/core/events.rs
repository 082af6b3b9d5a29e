// src/core/events.rs

//! Application lifecycle and vault file-system events that can trigger commands.

use crate::core::runner::{RunError, RunReport, RunTrigger, ShellCommandRunner};
use crate::models::{ShellCommandEntry, ShellCommandsConfig};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EventError {
    #[error("Unknown event '{0}'. Known events: {1}.")]
    UnknownEvent(String, String),
    #[error("Event '{0}' needs a path.")]
    MissingPath(ShellCommandEvent),
    #[error("Event '{0}' needs the old path of the renamed item.")]
    MissingOldPath(ShellCommandEvent),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ShellCommandEvent {
    Startup,
    Quit,
    FileCreated,
    FileModified,
    FileDeleted,
    FileRenamed,
    FolderCreated,
    FolderDeleted,
    FolderRenamed,
}

impl ShellCommandEvent {
    pub const ALL: [Self; 9] = [
        Self::Startup,
        Self::Quit,
        Self::FileCreated,
        Self::FileModified,
        Self::FileDeleted,
        Self::FileRenamed,
        Self::FolderCreated,
        Self::FolderDeleted,
        Self::FolderRenamed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Quit => "quit",
            Self::FileCreated => "file-created",
            Self::FileModified => "file-modified",
            Self::FileDeleted => "file-deleted",
            Self::FileRenamed => "file-renamed",
            Self::FolderCreated => "folder-created",
            Self::FolderDeleted => "folder-deleted",
            Self::FolderRenamed => "folder-renamed",
        }
    }

    pub fn is_file_event(self) -> bool {
        matches!(
            self,
            Self::FileCreated | Self::FileModified | Self::FileDeleted | Self::FileRenamed
        )
    }

    pub fn is_folder_event(self) -> bool {
        matches!(
            self,
            Self::FolderCreated | Self::FolderDeleted | Self::FolderRenamed
        )
    }

    pub fn is_rename(self) -> bool {
        matches!(self, Self::FileRenamed | Self::FolderRenamed)
    }
}

impl fmt::Display for ShellCommandEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShellCommandEvent {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| {
                let known = Self::ALL.map(Self::as_str).join(", ");
                EventError::UnknownEvent(s.to_string(), known)
            })
    }
}

/// What happened, and to which vault item. Paths are relative to the vault root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventData {
    pub event: ShellCommandEvent,
    pub path: Option<PathBuf>,
    pub old_path: Option<PathBuf>,
}

impl EventData {
    /// Validates that file/folder events carry a path and renames carry the old one.
    pub fn new(
        event: ShellCommandEvent,
        path: Option<PathBuf>,
        old_path: Option<PathBuf>,
    ) -> Result<Self, EventError> {
        if (event.is_file_event() || event.is_folder_event()) && path.is_none() {
            return Err(EventError::MissingPath(event));
        }
        if event.is_rename() && old_path.is_none() {
            return Err(EventError::MissingOldPath(event));
        }
        Ok(Self {
            event,
            path,
            old_path,
        })
    }

    /// The affected file, for file events.
    pub fn file_path(&self) -> Option<&PathBuf> {
        self.path.as_ref().filter(|_| self.event.is_file_event())
    }

    /// The affected folder: the folder itself for folder events, the file's parent for file events.
    pub fn folder_path(&self) -> Option<PathBuf> {
        let path = self.path.as_ref()?;
        if self.event.is_folder_event() {
            Some(path.clone())
        } else if self.event.is_file_event() {
            Some(path.parent().map(PathBuf::from).unwrap_or_default())
        } else {
            None
        }
    }
}

/// The commands that have `event` enabled, in configuration order.
pub fn commands_for_event(
    config: &ShellCommandsConfig,
    event: ShellCommandEvent,
) -> impl Iterator<Item = &ShellCommandEntry> {
    config
        .commands
        .iter()
        .filter(move |c| c.events.contains(&event))
}

/// Runs every command enabled for the event, one after another.
///
/// A failing command does not stop the others; each outcome is returned
/// alongside the command id.
pub async fn trigger_event(
    runner: &ShellCommandRunner,
    data: EventData,
) -> Vec<(String, Result<RunReport, RunError>)> {
    let trigger = RunTrigger::for_event(data.clone());
    let mut outcomes = Vec::new();
    for entry in commands_for_event(runner.config(), data.event) {
        log::debug!("Event '{}' triggers '{}'.", data.event, entry.id);
        let outcome = runner.run(entry, &trigger).await;
        outcomes.push((entry.id.clone(), outcome));
    }
    outcomes
}
