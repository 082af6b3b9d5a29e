//! # Host
//!
//! The editor application a command runs inside of. Variables query it (active
//! file, selection, clipboard...) and output channels write to it. Anything the
//! host cannot provide right now is `None`.
//!
//! Two implementations exist: [`terminal::TerminalHost`] for the command line
//! and [`memory::MemoryHost`], an in-memory editor that records what happened to it.

pub mod memory;
pub mod terminal;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A 1-based caret position. `column` counts characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaretPosition {
    pub line: usize,
    pub column: usize,
}

/// Where text goes when it is inserted into the active file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    /// At the caret, replacing the selection if there is one.
    Caret,
    Top,
    Bottom,
    ReplaceSelection,
}

/// An output channel could not accept text.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("No file is open to write the output to.")]
    NoActiveFile,
    #[error("The active file has no caret position.")]
    NoCaret,
    #[error("Nothing is selected in the active file.")]
    NoSelection,
    #[error("Clipboard error: {0}")]
    Clipboard(String),
    #[error("Could not write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Passing output to shell command '{id}' failed: {message}")]
    Refeed { id: String, message: String },
}

#[async_trait]
pub trait Host: Send + Sync {
    /// Absolute path of the vault root.
    fn vault_path(&self) -> &Path;

    /// The active file, relative to the vault root.
    fn active_file(&self) -> Option<PathBuf>;

    async fn active_file_content(&self) -> Option<String>;

    async fn write_active_file(&self, content: &str) -> Result<(), SinkError>;

    fn selection(&self) -> Option<String>;

    fn caret(&self) -> Option<CaretPosition>;

    fn workspace_name(&self) -> Option<String>;

    async fn read_clipboard(&self) -> Option<String>;

    async fn write_clipboard(&self, text: &str) -> Result<(), SinkError>;

    async fn notify(&self, message: &str);

    async fn notify_error(&self, message: &str);

    async fn set_status_bar(&self, text: &str);

    /// Asks the user a yes/no question.
    async fn confirm(&self, prompt: &str) -> bool;

    async fn insert_into_active_file(
        &self,
        position: InsertPosition,
        text: &str,
    ) -> Result<(), SinkError> {
        if self.active_file().is_none() {
            return Err(SinkError::NoActiveFile);
        }
        let caret = self.caret();
        let selection = self.selection();
        let content = self
            .active_file_content()
            .await
            .ok_or(SinkError::NoActiveFile)?;
        let updated = apply_insertion(&content, position, caret, selection.as_deref(), text)?;
        self.write_active_file(&updated).await
    }

    async fn replace_current_line(&self, text: &str) -> Result<(), SinkError> {
        if self.active_file().is_none() {
            return Err(SinkError::NoActiveFile);
        }
        let caret = self.caret().ok_or(SinkError::NoCaret)?;
        let content = self
            .active_file_content()
            .await
            .ok_or(SinkError::NoActiveFile)?;
        let updated = replace_line(&content, caret.line, text)?;
        self.write_active_file(&updated).await
    }
}

/// Computes the new file content after inserting `text`.
///
/// Top and bottom insertions are kept on lines of their own. A selection is
/// located by its first occurrence in the content.
pub fn apply_insertion(
    content: &str,
    position: InsertPosition,
    caret: Option<CaretPosition>,
    selection: Option<&str>,
    text: &str,
) -> Result<String, SinkError> {
    let selection = selection.filter(|s| !s.is_empty());
    match position {
        InsertPosition::Top if content.is_empty() => Ok(text.to_string()),
        InsertPosition::Top => Ok(format!("{}\n{}", text, content)),
        InsertPosition::Bottom if content.is_empty() || content.ends_with('\n') => {
            Ok(format!("{}{}", content, text))
        }
        InsertPosition::Bottom => Ok(format!("{}\n{}", content, text)),
        InsertPosition::ReplaceSelection => {
            let selected = selection.ok_or(SinkError::NoSelection)?;
            content
                .find(selected)
                .map(|start| splice(content, start..start + selected.len(), text))
                .ok_or(SinkError::NoSelection)
        }
        InsertPosition::Caret => {
            if let Some(selected) = selection
                && let Some(start) = content.find(selected)
            {
                return Ok(splice(content, start..start + selected.len(), text));
            }
            let offset = caret_offset(content, caret.ok_or(SinkError::NoCaret)?);
            Ok(splice(content, offset..offset, text))
        }
    }
}

/// Replaces line `line` (1-based) with `text`, keeping its line terminator.
pub fn replace_line(content: &str, line: usize, text: &str) -> Result<String, SinkError> {
    let mut out = String::with_capacity(content.len() + text.len());
    let mut found = false;
    for (index, current) in content.split_inclusive('\n').enumerate() {
        if index + 1 == line {
            out.push_str(text);
            if current.ends_with("\r\n") {
                out.push_str("\r\n");
            } else if current.ends_with('\n') {
                out.push('\n');
            }
            found = true;
        } else {
            out.push_str(current);
        }
    }
    if found { Ok(out) } else { Err(SinkError::NoCaret) }
}

/// Byte offset of a caret. Positions past the end of a line or of the file are clamped.
fn caret_offset(content: &str, caret: CaretPosition) -> usize {
    let mut offset = 0;
    for (index, line) in content.split_inclusive('\n').enumerate() {
        if index + 1 == caret.line {
            let body = line.trim_end_matches(['\n', '\r']);
            let column = body
                .char_indices()
                .nth(caret.column.saturating_sub(1))
                .map_or(body.len(), |(byte, _)| byte);
            return offset + column;
        }
        offset += line.len();
    }
    content.len()
}

fn splice(content: &str, range: std::ops::Range<usize>, text: &str) -> String {
    let mut out = String::with_capacity(content.len() + text.len());
    out.push_str(content.get(..range.start).unwrap_or_default());
    out.push_str(text);
    out.push_str(content.get(range.end..).unwrap_or_default());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = "first line\nsecond line\n";

    fn at(line: usize, column: usize) -> Option<CaretPosition> {
        Some(CaretPosition { line, column })
    }

    #[test]
    fn test_insert_at_caret() {
        let out = apply_insertion(DOC, InsertPosition::Caret, at(2, 8), None, "X").unwrap();
        assert_eq!(out, "first line\nsecond Xline\n");
        let out = apply_insertion(DOC, InsertPosition::Caret, at(1, 99), None, "!").unwrap();
        assert_eq!(out, "first line!\nsecond line\n");
        let out = apply_insertion(DOC, InsertPosition::Caret, at(9, 1), None, "end").unwrap();
        assert_eq!(out, "first line\nsecond line\nend");
    }

    #[test]
    fn test_caret_insertion_replaces_selection() {
        let out = apply_insertion(DOC, InsertPosition::Caret, at(1, 1), Some("second"), "2nd").unwrap();
        assert_eq!(out, "first line\n2nd line\n");
    }

    #[test]
    fn test_caret_insertion_without_caret_fails() {
        let result = apply_insertion(DOC, InsertPosition::Caret, None, None, "x");
        assert!(matches!(result, Err(SinkError::NoCaret)));
    }

    #[test]
    fn test_caret_column_counts_characters() {
        let out = apply_insertion("héllo", InsertPosition::Caret, at(1, 3), None, "_").unwrap();
        assert_eq!(out, "hé_llo");
    }

    #[test]
    fn test_top_and_bottom() {
        assert_eq!(
            apply_insertion(DOC, InsertPosition::Top, None, None, "head").unwrap(),
            "head\nfirst line\nsecond line\n"
        );
        assert_eq!(
            apply_insertion(DOC, InsertPosition::Bottom, None, None, "tail").unwrap(),
            "first line\nsecond line\ntail"
        );
        assert_eq!(
            apply_insertion("no newline", InsertPosition::Bottom, None, None, "tail").unwrap(),
            "no newline\ntail"
        );
        assert_eq!(
            apply_insertion("", InsertPosition::Top, None, None, "only").unwrap(),
            "only"
        );
    }

    #[test]
    fn test_replace_selection() {
        assert_eq!(
            apply_insertion(DOC, InsertPosition::ReplaceSelection, None, Some("line"), "row").unwrap(),
            "first row\nsecond line\n"
        );
        assert!(matches!(
            apply_insertion(DOC, InsertPosition::ReplaceSelection, None, None, "x"),
            Err(SinkError::NoSelection)
        ));
        assert!(matches!(
            apply_insertion(DOC, InsertPosition::ReplaceSelection, None, Some("absent"), "x"),
            Err(SinkError::NoSelection)
        ));
    }

    #[test]
    fn test_replace_line() {
        assert_eq!(replace_line(DOC, 2, "new").unwrap(), "first line\nnew\n");
        assert_eq!(replace_line("a\r\nb", 1, "z").unwrap(), "z\r\nb");
        assert!(matches!(replace_line(DOC, 3, "x"), Err(SinkError::NoCaret)));
    }
}
