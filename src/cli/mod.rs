// src/cli/mod.rs

use crate::host::CaretPosition;
use clap::Parser;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::PathBuf;

pub mod dispatcher;
pub mod handlers;

lazy_static! {
    static ref CARET_RE: Regex = Regex::new(r"^(\d+):(\d+)$").unwrap();
}

/// shell-commands: run named shell commands with {{variables}} against a notes vault.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    after_help = "Actions: run (exec), list (ls), preview, trigger, variables (vars), parse.\n\
                  An unknown action is treated as a command id: `shell-commands <id>` runs it.",
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
#[command(disable_help_subcommand = true)]
#[command(trailing_var_arg = true)]
pub struct Cli {
    /// Configuration file. Defaults to `<config dir>/shell-commands/config.toml`.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Root directory of the vault.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub vault: PathBuf,

    /// The file that counts as open in the editor, relative to the vault root.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Caret position in the active file, as LINE:COLUMN (1-based).
    #[arg(long, value_name = "LINE:COLUMN", value_parser = parse_caret)]
    pub caret: Option<CaretPosition>,

    /// Text that counts as selected in the active file.
    #[arg(long)]
    pub selection: Option<String>,

    /// Name of the current workspace.
    #[arg(long)]
    pub workspace: Option<String>,

    /// Give a custom variable a value for this run (e.g. `_project=demo`). Repeatable.
    #[arg(long = "set", value_name = "_NAME=VALUE")]
    pub set: Vec<String>,

    /// Answer yes to every confirmation prompt.
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// The action and its arguments.
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Parses `LINE:COLUMN`.
pub fn parse_caret(text: &str) -> Result<CaretPosition, String> {
    let invalid = || format!("'{}' is not a LINE:COLUMN position", text);
    let captures = CARET_RE.captures(text.trim()).ok_or_else(invalid)?;
    let number = |i: usize| {
        captures
            .get(i)
            .and_then(|m| m.as_str().parse::<usize>().ok())
            .filter(|n| *n > 0)
    };
    match (number(1), number(2)) {
        (Some(line), Some(column)) => Ok(CaretPosition { line, column }),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_caret() {
        assert_eq!(parse_caret("3:14"), Ok(CaretPosition { line: 3, column: 14 }));
        assert!(parse_caret("0:1").is_err());
        assert!(parse_caret("3").is_err());
        assert!(parse_caret("a:b").is_err());
    }

    #[test]
    fn test_cli_keeps_action_arguments_verbatim() {
        let cli = Cli::try_parse_from([
            "shell-commands",
            "--vault",
            "/notes",
            "--set",
            "_tag=x",
            "list",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.vault, PathBuf::from("/notes"));
        assert_eq!(cli.set, vec!["_tag=x".to_string()]);
        assert_eq!(cli.args, vec!["list".to_string(), "--json".to_string()]);
    }
}
