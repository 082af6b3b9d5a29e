// src/core/variables/event.rs

//! Variables that describe the event which triggered a command. Outside such an
//! event they are unavailable.

use super::{
    BoundArguments, ParameterKind, ParameterSpec, Variable, VariableContext, VariableError,
    builtin::{extension_of, file_name_of, folder_name_of, path_in_mode, title_of},
};
use crate::core::events::EventData;
use async_trait::async_trait;
use std::{path::PathBuf, sync::Arc};

const PATH_MODES: &[&str] = &["relative", "absolute"];
const DOT_MODES: &[&str] = &["with-dot", "no-dot"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventVariable {
    FileName,
    FilePath,
    FolderName,
    FolderPath,
    Title,
    FileExtension,
    OldFilePath,
}

impl EventVariable {
    pub const ALL: [Self; 7] = [
        Self::FileName,
        Self::FilePath,
        Self::FolderName,
        Self::FolderPath,
        Self::Title,
        Self::FileExtension,
        Self::OldFilePath,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FileName => "event_file_name",
            Self::FilePath => "event_file_path",
            Self::FolderName => "event_folder_name",
            Self::FolderPath => "event_folder_path",
            Self::Title => "event_title",
            Self::FileExtension => "event_file_extension",
            Self::OldFilePath => "event_old_file_path",
        }
    }

    /// The vault-relative path this variable reads from the event, if the event carries one.
    fn subject(self, data: &EventData) -> Option<PathBuf> {
        match self {
            Self::FolderName | Self::FolderPath => data.folder_path(),
            Self::OldFilePath => data.old_path.clone().filter(|_| data.event.is_file_event()),
            _ => data.file_path().cloned(),
        }
    }
}

pub fn all() -> Vec<Arc<dyn Variable>> {
    EventVariable::ALL
        .into_iter()
        .map(|v| Arc::new(v) as Arc<dyn Variable>)
        .collect()
}

#[async_trait]
impl Variable for EventVariable {
    fn name(&self) -> &str {
        self.as_str()
    }

    fn description(&self) -> &str {
        match self {
            Self::FileName => "File name of the file the event concerns.",
            Self::FilePath => "Path of the file the event concerns.",
            Self::FolderName => "Name of the folder the event concerns.",
            Self::FolderPath => "Path of the folder the event concerns.",
            Self::Title => "File name without extension of the file the event concerns.",
            Self::FileExtension => "Extension of the file the event concerns.",
            Self::OldFilePath => "Path the renamed file had before the rename.",
        }
    }

    fn parameters(&self) -> &[ParameterSpec] {
        const PATH: [ParameterSpec; 1] =
            [ParameterSpec::required("mode", ParameterKind::OneOf(PATH_MODES))];
        const EXTENSION: [ParameterSpec; 1] = [ParameterSpec::with_default(
            "dot",
            ParameterKind::OneOf(DOT_MODES),
            "no-dot",
        )];
        match self {
            Self::FilePath | Self::FolderPath | Self::OldFilePath => &PATH,
            Self::FileExtension => &EXTENSION,
            _ => &[],
        }
    }

    fn always_available(&self) -> bool {
        false
    }

    async fn is_available(&self, ctx: &VariableContext<'_>) -> bool {
        ctx.event.and_then(|data| self.subject(data)).is_some()
    }

    fn unavailable_message(&self, ctx: &VariableContext<'_>) -> String {
        match ctx.event {
            None => format!(
                "{{{{{}}}}} is only available when the command is triggered by an event.",
                self.as_str()
            ),
            Some(data) => format!(
                "{{{{{}}}}} is not available for the '{}' event.",
                self.as_str(),
                data.event
            ),
        }
    }

    async fn generate_value(
        &self,
        args: &BoundArguments,
        ctx: &VariableContext<'_>,
    ) -> Result<String, VariableError> {
        let subject = ctx
            .event
            .and_then(|data| self.subject(data))
            .ok_or_else(|| VariableError::new(self.unavailable_message(ctx)))?;
        let vault = ctx.host.vault_path();
        Ok(match self {
            Self::FileName => file_name_of(&subject),
            Self::Title => title_of(&subject),
            Self::FileExtension => extension_of(&subject, args.get("dot") == Some("with-dot")),
            Self::FolderName => folder_name_of(vault, &subject),
            Self::FilePath | Self::FolderPath | Self::OldFilePath => {
                path_in_mode(vault, &subject, args.get("mode"))
            }
        })
    }
}
