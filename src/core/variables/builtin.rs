// src/core/variables/builtin.rs

use super::{
    BoundArguments, ParameterKind, ParameterSpec, Variable, VariableContext, VariableError, event,
};
use crate::{core::paths::display_path, host::Host, system::shell::Platform};
use async_trait::async_trait;
use chrono::{
    Local,
    format::{Item, StrftimeItems},
};
use std::{env, path::Path, sync::Arc};

const PATH_MODES: &[&str] = &["relative", "absolute"];
const DOT_MODES: &[&str] = &["with-dot", "no-dot"];
const CARET_PARTS: &[&str] = &["line", "column"];

const PATH_MODE: [ParameterSpec; 1] = [ParameterSpec::required("mode", ParameterKind::OneOf(PATH_MODES))];

/// The variables every installation has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Clipboard,
    CaretPosition,
    Date,
    Environment,
    FileContent,
    FileExtension,
    FileName,
    FilePath,
    FolderName,
    FolderPath,
    Newline,
    OperatingSystem,
    Output,
    Passthrough,
    Selection,
    Shell,
    Title,
    VaultPath,
    Workspace,
}

impl Builtin {
    pub const ALL: [Self; 19] = [
        Self::Clipboard,
        Self::CaretPosition,
        Self::Date,
        Self::Environment,
        Self::FileContent,
        Self::FileExtension,
        Self::FileName,
        Self::FilePath,
        Self::FolderName,
        Self::FolderPath,
        Self::Newline,
        Self::OperatingSystem,
        Self::Output,
        Self::Passthrough,
        Self::Selection,
        Self::Shell,
        Self::Title,
        Self::VaultPath,
        Self::Workspace,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clipboard => "clipboard",
            Self::CaretPosition => "caret_position",
            Self::Date => "date",
            Self::Environment => "environment",
            Self::FileContent => "file_content",
            Self::FileExtension => "file_extension",
            Self::FileName => "file_name",
            Self::FilePath => "file_path",
            Self::FolderName => "folder_name",
            Self::FolderPath => "folder_path",
            Self::Newline => "newline",
            Self::OperatingSystem => "operating_system",
            Self::Output => "output",
            Self::Passthrough => "passthrough",
            Self::Selection => "selection",
            Self::Shell => "shell",
            Self::Title => "title",
            Self::VaultPath => "vault_path",
            Self::Workspace => "workspace",
        }
    }

    /// Whether the variable reads the active file.
    fn needs_active_file(self) -> bool {
        matches!(
            self,
            Self::FileContent
                | Self::FileExtension
                | Self::FileName
                | Self::FilePath
                | Self::FolderName
                | Self::FolderPath
                | Self::Title
        )
    }
}

/// All built-in providers, ready for registration.
pub fn all() -> Vec<Arc<dyn Variable>> {
    Builtin::ALL
        .into_iter()
        .map(|b| Arc::new(b) as Arc<dyn Variable>)
        .collect()
}

/// Whether `name` belongs to a built-in or event variable.
pub fn is_builtin_name(name: &str) -> bool {
    Builtin::ALL.iter().any(|b| b.as_str() == name)
        || event::EventVariable::ALL.iter().any(|e| e.as_str() == name)
}

#[async_trait]
impl Variable for Builtin {
    fn name(&self) -> &str {
        self.as_str()
    }

    fn description(&self) -> &str {
        match self {
            Self::Clipboard => "Text currently on the clipboard.",
            Self::CaretPosition => "Caret position in the active file as line:column.",
            Self::Date => "The current local date and time, in a strftime format.",
            Self::Environment => "The value of an environment variable.",
            Self::FileContent => "The whole text of the active file.",
            Self::FileExtension => "Extension of the active file.",
            Self::FileName => "File name of the active file, with extension.",
            Self::FilePath => "Path of the active file.",
            Self::FolderName => "Name of the folder holding the active file.",
            Self::FolderPath => "Path of the folder holding the active file.",
            Self::Newline => "One or more newline characters.",
            Self::OperatingSystem => "Name of the current operating system.",
            Self::Output => "Output handed over by another shell command.",
            Self::Passthrough => "Returns its argument unchanged.",
            Self::Selection => "The selected text in the active file.",
            Self::Shell => "Name of the shell that runs the command.",
            Self::Title => "File name of the active file, without extension.",
            Self::VaultPath => "Absolute path of the vault root.",
            Self::Workspace => "Name of the current workspace.",
        }
    }

    fn parameters(&self) -> &[ParameterSpec] {
        const CARET: [ParameterSpec; 1] =
            [ParameterSpec::optional("part", ParameterKind::OneOf(CARET_PARTS))];
        const DATE: [ParameterSpec; 1] = [ParameterSpec::required("format", ParameterKind::Text)];
        const ENVIRONMENT: [ParameterSpec; 1] =
            [ParameterSpec::required("variable", ParameterKind::Text)];
        const EXTENSION: [ParameterSpec; 1] = [ParameterSpec::with_default(
            "dot",
            ParameterKind::OneOf(DOT_MODES),
            "no-dot",
        )];
        const NEWLINE: [ParameterSpec; 1] =
            [ParameterSpec::optional("count", ParameterKind::Integer)];
        const PASSTHROUGH: [ParameterSpec; 1] =
            [ParameterSpec::required("value", ParameterKind::Text)];

        match self {
            Self::CaretPosition => &CARET,
            Self::Date => &DATE,
            Self::Environment => &ENVIRONMENT,
            Self::FileExtension => &EXTENSION,
            Self::FilePath | Self::FolderPath => &PATH_MODE,
            Self::Newline => &NEWLINE,
            Self::Passthrough => &PASSTHROUGH,
            _ => &[],
        }
    }

    fn always_available(&self) -> bool {
        !(self.needs_active_file()
            || matches!(
                self,
                Self::CaretPosition | Self::Output | Self::Selection | Self::Workspace
            ))
    }

    async fn is_available(&self, ctx: &VariableContext<'_>) -> bool {
        match self {
            b if b.needs_active_file() => ctx.host.active_file().is_some(),
            Self::CaretPosition => ctx.host.caret().is_some(),
            Self::Output => ctx.output.is_some(),
            Self::Selection => ctx.host.selection().is_some_and(|s| !s.is_empty()),
            Self::Workspace => ctx.host.workspace_name().is_some(),
            _ => true,
        }
    }

    fn unavailable_message(&self, _ctx: &VariableContext<'_>) -> String {
        match self {
            b if b.needs_active_file() => {
                format!("{{{{{}}}}} needs an active file, but no file is open.", self.as_str())
            }
            Self::CaretPosition => "{{caret_position}} needs an active file with a caret.".to_string(),
            Self::Output => {
                "{{output}} is only available when another shell command passes its output here."
                    .to_string()
            }
            Self::Selection => "{{selection}} needs selected text in the active file.".to_string(),
            Self::Workspace => "No workspace is open.".to_string(),
            _ => format!("{{{{{}}}}} is not available right now.", self.as_str()),
        }
    }

    async fn generate_value(
        &self,
        args: &BoundArguments,
        ctx: &VariableContext<'_>,
    ) -> Result<String, VariableError> {
        let host = ctx.host;
        match self {
            Self::Clipboard => host
                .read_clipboard()
                .await
                .ok_or_else(|| VariableError::new("The clipboard does not contain text.")),
            Self::CaretPosition => {
                let caret = host
                    .caret()
                    .ok_or_else(|| VariableError::new(self.unavailable_message(ctx)))?;
                Ok(match args.get("part") {
                    Some("line") => caret.line.to_string(),
                    Some("column") => caret.column.to_string(),
                    _ => format!("{}:{}", caret.line, caret.column),
                })
            }
            Self::Date => format_date(args.get("format").unwrap_or_default()),
            Self::Environment => {
                let name = args.get("variable").unwrap_or_default();
                env::var(name).map_err(|_| {
                    VariableError::new(format!("Environment variable '{}' is not set.", name))
                })
            }
            Self::FileContent => host
                .active_file_content()
                .await
                .ok_or_else(|| VariableError::new("The active file could not be read.")),
            Self::FileExtension => {
                let file = active_file(host, self)?;
                Ok(extension_of(&file, args.get("dot") == Some("with-dot")))
            }
            Self::FileName => {
                let file = active_file(host, self)?;
                Ok(file_name_of(&file))
            }
            Self::FilePath => {
                let file = active_file(host, self)?;
                Ok(path_in_mode(host.vault_path(), &file, args.get("mode")))
            }
            Self::FolderName => {
                let file = active_file(host, self)?;
                Ok(folder_name_of(host.vault_path(), parent_of(&file)))
            }
            Self::FolderPath => {
                let file = active_file(host, self)?;
                Ok(path_in_mode(host.vault_path(), parent_of(&file), args.get("mode")))
            }
            Self::Newline => {
                let count = args.get_integer("count").unwrap_or(1);
                Ok("\n".repeat(usize::try_from(count).unwrap_or(usize::MAX).min(1024)))
            }
            Self::OperatingSystem => Ok(Platform::current().display_name().to_string()),
            Self::Output => ctx
                .output
                .map(str::to_string)
                .ok_or_else(|| VariableError::new(self.unavailable_message(ctx))),
            Self::Passthrough => Ok(args.get("value").unwrap_or_default().to_string()),
            Self::Selection => host
                .selection()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| VariableError::new(self.unavailable_message(ctx))),
            Self::Shell => Ok(ctx.shell.name.clone()),
            Self::Title => {
                let file = active_file(host, self)?;
                Ok(title_of(&file))
            }
            Self::VaultPath => Ok(display_path(host.vault_path())),
            Self::Workspace => host
                .workspace_name()
                .ok_or_else(|| VariableError::new(self.unavailable_message(ctx))),
        }
    }
}

fn active_file(host: &dyn Host, variable: &Builtin) -> Result<std::path::PathBuf, VariableError> {
    host.active_file().ok_or_else(|| {
        VariableError::new(format!(
            "{{{{{}}}}} needs an active file, but no file is open.",
            variable.as_str()
        ))
    })
}

/// Formats the current local time. Invalid format strings are rejected up front
/// so that chrono never panics while rendering.
fn format_date(format: &str) -> Result<String, VariableError> {
    let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(VariableError::new(format!("Invalid date format '{}'.", format)));
    }
    Ok(Local::now().format_with_items(items.into_iter()).to_string())
}

// --- Path helpers shared with the event variables ---

/// The parent folder of a vault-relative path; empty for items at the vault root.
pub(crate) fn parent_of(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new(""))
}

/// Renders a vault-relative path as `relative` (the default) or `absolute`.
/// The vault root itself is `.` in relative mode.
pub(crate) fn path_in_mode(vault: &Path, relative: &Path, mode: Option<&str>) -> String {
    if mode == Some("absolute") {
        return display_path(&vault.join(relative));
    }
    if relative.as_os_str().is_empty() {
        ".".to_string()
    } else {
        display_path(relative)
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub(crate) fn title_of(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// The extension of `path`, or an empty string when it has none.
pub(crate) fn extension_of(path: &Path, with_dot: bool) -> String {
    match path.extension() {
        Some(ext) if with_dot => format!(".{}", ext.to_string_lossy()),
        Some(ext) => ext.to_string_lossy().into_owned(),
        None => String::new(),
    }
}

/// The name of a vault-relative folder. The vault root is named after the vault directory.
pub(crate) fn folder_name_of(vault: &Path, folder: &Path) -> String {
    let folder = if folder.as_os_str().is_empty() {
        vault
    } else {
        folder
    };
    file_name_of(folder)
}
