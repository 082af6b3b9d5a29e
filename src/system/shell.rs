// src/system/shell.rs

use crate::{core::paths, models::ShellConfig};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    env,
    ffi::OsString,
    fmt,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShellError {
    #[error(
        "Requested shell '{name}' is neither a built-in shell nor defined in the [shells] table. Built-in shells: {known}."
    )]
    ShellNotDefined { name: String, known: String },
    #[error("Shell '{name}' has an invalid path: {message}")]
    InvalidPath { name: String, message: String },
    #[error("Cannot tell how to quote values for shell '{name}' ({path}); set `dialect` in [shells.{name}].")]
    UnknownDialect { name: String, path: String },
}

/// Binaries that follow POSIX double-quote rules.
const POSIX_SHELLS: &[&str] = &["sh", "bash", "dash", "zsh", "ksh", "ash"];

const FALLBACK_POSIX_SHELL: &str = "/bin/sh";

/// The operating systems a command can carry its own command text and shell for.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Macos,
    Windows,
}

impl Platform {
    /// The platform this binary was compiled for. Unknown Unix flavours count as Linux.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::Macos
        } else {
            Self::Linux
        }
    }

    /// The human readable name used by `{{operating_system}}`.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Linux => "Linux",
            Self::Macos => "macOS",
            Self::Windows => "Windows",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// The quoting rules of a shell family.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ShellDialect {
    /// POSIX shells (sh, bash, dash, zsh): `"..."` with `\`, `"`, `$` and `` ` `` backslash-escaped.
    DoubleQuote,
    /// PowerShell: `'...'` with every embedded `'` doubled.
    SingleQuote,
    /// cmd.exe: `"..."` with every embedded `"` doubled.
    CmdDoubleQuote,
}

/// A fully resolved shell: the binary to spawn, the arguments that precede the
/// command string and the dialect its command string must be escaped for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    pub name: String,
    pub path: PathBuf,
    pub args: Vec<String>,
    pub dialect: ShellDialect,
}

impl Shell {
    fn new(name: &str, path: impl Into<PathBuf>, dialect: ShellDialect) -> Self {
        Self {
            name: name.to_string(),
            path: path.into(),
            args: default_args_for(dialect),
            dialect,
        }
    }
}

/// The arguments that make a shell of the given dialect execute the string that follows.
pub fn default_args_for(dialect: ShellDialect) -> Vec<String> {
    match dialect {
        ShellDialect::DoubleQuote => vec!["-c".to_string()],
        ShellDialect::SingleQuote => vec![
            "-NoProfile".to_string(),
            "-NonInteractive".to_string(),
            "-Command".to_string(),
        ],
        ShellDialect::CmdDoubleQuote => vec!["/C".to_string()],
    }
}

/// Infers the dialect of a shell binary from its file stem.
///
/// `None` for shells with their own quoting rules (fish, csh, nu...).
pub fn dialect_for_binary(path: &Path) -> Option<ShellDialect> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match stem.as_str() {
        "powershell" | "pwsh" => Some(ShellDialect::SingleQuote),
        "cmd" => Some(ShellDialect::CmdDoubleQuote),
        s if POSIX_SHELLS.contains(&s) => Some(ShellDialect::DoubleQuote),
        _ => None,
    }
}

/// Resolves a shell selector (`None`/`"default"`, a built-in id, or a name from
/// the configuration's `[shells]` table) into a spawnable [`Shell`].
///
/// User-defined shells win over built-ins with the same name, so a `[shells.bash]`
/// entry can point `bash` to a different binary.
pub fn resolve_shell(
    selector: Option<&str>,
    platform: Platform,
    custom_shells: &BTreeMap<String, ShellConfig>,
) -> Result<Shell, ShellError> {
    let name = match selector.map(str::trim) {
        None | Some("") | Some("default") => return Ok(default_shell(platform)),
        Some(name) => name,
    };

    if let Some(config) = custom_shells.get(name) {
        return shell_from_config(name, config);
    }

    let shell = builtin_shell(name, platform).ok_or_else(|| ShellError::ShellNotDefined {
        name: name.to_string(),
        known: builtin_shell_ids(platform).join(", "),
    })?;
    if !is_executable_in_path(&shell.path) {
        log::debug!(
            "Shell '{}' ({}) was not found in PATH; spawning will likely fail.",
            name,
            shell.path.display()
        );
    }
    Ok(shell)
}

/// The shell used when a command does not select one for the current platform.
///
/// On Windows this is Windows PowerShell; elsewhere it is the user's `$SHELL`
/// when that is a POSIX shell, otherwise `/bin/sh`.
pub fn default_shell(platform: Platform) -> Shell {
    match platform {
        Platform::Windows => Shell::new("powershell", "powershell.exe", ShellDialect::SingleQuote),
        Platform::Linux | Platform::Macos => posix_default_shell(env::var_os("SHELL")),
    }
}

/// The default shell for a given `$SHELL` value.
fn posix_default_shell(shell_env: Option<OsString>) -> Shell {
    let path = shell_env.filter(|s| !s.is_empty()).map(PathBuf::from);
    if let Some(path) = path {
        if dialect_for_binary(&path) == Some(ShellDialect::DoubleQuote) {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "sh".to_string());
            return Shell::new(&name, path, ShellDialect::DoubleQuote);
        }
        log::debug!(
            "$SHELL '{}' is not a POSIX shell; using {} instead.",
            path.display(),
            FALLBACK_POSIX_SHELL
        );
    }
    Shell::new("sh", FALLBACK_POSIX_SHELL, ShellDialect::DoubleQuote)
}

/// Looks up one of the built-in shell identifiers.
pub fn builtin_shell(id: &str, platform: Platform) -> Option<Shell> {
    let is_windows = platform == Platform::Windows;
    let posix = |binary: &str| {
        let path = if is_windows {
            format!("{}.exe", binary)
        } else {
            binary.to_string()
        };
        Shell::new(id, path, ShellDialect::DoubleQuote)
    };
    match id {
        id if POSIX_SHELLS.contains(&id) => Some(posix(id)),
        "powershell" if is_windows => Some(Shell::new(
            id,
            "powershell.exe",
            ShellDialect::SingleQuote,
        )),
        // Windows PowerShell only exists on Windows; elsewhere the id maps to PowerShell Core.
        "powershell" | "pwsh" => Some(Shell::new(
            id,
            if is_windows { "pwsh.exe" } else { "pwsh" },
            ShellDialect::SingleQuote,
        )),
        "cmd" if is_windows => Some(Shell::new(id, "cmd.exe", ShellDialect::CmdDoubleQuote)),
        _ => None,
    }
}

/// The identifiers accepted by [`builtin_shell`] on the given platform.
pub fn builtin_shell_ids(platform: Platform) -> Vec<&'static str> {
    let mut ids = POSIX_SHELLS.to_vec();
    ids.extend(["powershell", "pwsh"]);
    if platform == Platform::Windows {
        ids.push("cmd");
    }
    ids
}

fn shell_from_config(name: &str, config: &ShellConfig) -> Result<Shell, ShellError> {
    let path =
        paths::expand_path(&config.path).map_err(|e| ShellError::InvalidPath {
            name: name.to_string(),
            message: e.to_string(),
        })?;
    let dialect = config
        .dialect
        .or_else(|| dialect_for_binary(&path))
        .ok_or_else(|| ShellError::UnknownDialect {
            name: name.to_string(),
            path: path.display().to_string(),
        })?;
    let args = config
        .args
        .clone()
        .unwrap_or_else(|| default_args_for(dialect));
    Ok(Shell {
        name: name.to_string(),
        path,
        args,
        dialect,
    })
}

fn is_executable_in_path(executable: &Path) -> bool {
    if executable.is_absolute() {
        return executable.is_file();
    }
    if let Some(path_var) = env::var_os("PATH") {
        for dir in env::split_paths(&path_var) {
            if dir.join(executable).is_file() {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_posix_shell_uses_dash_c() {
        let shell = resolve_shell(Some("bash"), Platform::Linux, &BTreeMap::new()).unwrap();
        assert_eq!(shell.path, PathBuf::from("bash"));
        assert_eq!(shell.args, vec!["-c".to_string()]);
        assert_eq!(shell.dialect, ShellDialect::DoubleQuote);
    }

    #[test]
    fn test_powershell_maps_to_pwsh_outside_windows() {
        let shell = resolve_shell(Some("powershell"), Platform::Macos, &BTreeMap::new()).unwrap();
        assert_eq!(shell.path, PathBuf::from("pwsh"));
        assert_eq!(shell.dialect, ShellDialect::SingleQuote);

        let shell = resolve_shell(Some("powershell"), Platform::Windows, &BTreeMap::new()).unwrap();
        assert_eq!(shell.path, PathBuf::from("powershell.exe"));
    }

    #[test]
    fn test_cmd_only_exists_on_windows() {
        assert!(builtin_shell("cmd", Platform::Linux).is_none());
        let cmd = builtin_shell("cmd", Platform::Windows).unwrap();
        assert_eq!(cmd.dialect, ShellDialect::CmdDoubleQuote);
        assert_eq!(cmd.args, vec!["/C".to_string()]);
    }

    #[test]
    fn test_unknown_shell_is_an_error() {
        let result = resolve_shell(Some("tcsh"), Platform::Linux, &BTreeMap::new());
        let error = result.unwrap_err();
        assert!(matches!(&error, ShellError::ShellNotDefined { name, .. } if name == "tcsh"));
        assert!(error.to_string().contains("sh, bash, dash, zsh, ksh, ash, powershell, pwsh"));
    }

    #[test]
    fn test_default_selector_resolves_to_platform_default() {
        let shell = resolve_shell(Some("default"), Platform::Windows, &BTreeMap::new()).unwrap();
        assert_eq!(shell.name, "powershell");
        assert_eq!(shell.dialect, ShellDialect::SingleQuote);
    }

    #[test]
    fn test_custom_shell_infers_dialect_from_binary() {
        let mut custom = BTreeMap::new();
        custom.insert(
            "core".to_string(),
            ShellConfig {
                path: "/opt/microsoft/pwsh".to_string(),
                args: None,
                dialect: None,
            },
        );
        let shell = resolve_shell(Some("core"), Platform::Linux, &custom).unwrap();
        assert_eq!(shell.dialect, ShellDialect::SingleQuote);
        assert_eq!(shell.args.last().map(String::as_str), Some("-Command"));
    }

    #[test]
    fn test_custom_shell_overrides_builtin_name() {
        let mut custom = BTreeMap::new();
        custom.insert(
            "bash".to_string(),
            ShellConfig {
                path: "/usr/local/bin/bash".to_string(),
                args: Some(vec!["--norc".to_string(), "-c".to_string()]),
                dialect: Some(ShellDialect::DoubleQuote),
            },
        );
        let shell = resolve_shell(Some("bash"), Platform::Linux, &custom).unwrap();
        assert_eq!(shell.path, PathBuf::from("/usr/local/bin/bash"));
        assert_eq!(shell.args, vec!["--norc".to_string(), "-c".to_string()]);
    }

    #[test]
    fn test_dialect_for_binary() {
        assert_eq!(
            dialect_for_binary(Path::new("C:/Windows/System32/cmd.exe")),
            Some(ShellDialect::CmdDoubleQuote)
        );
        assert_eq!(dialect_for_binary(Path::new("/bin/zsh")), Some(ShellDialect::DoubleQuote));
        assert_eq!(dialect_for_binary(Path::new("pwsh")), Some(ShellDialect::SingleQuote));
        assert_eq!(dialect_for_binary(Path::new("/usr/bin/fish")), None);
        assert_eq!(dialect_for_binary(Path::new("/bin/tcsh")), None);
    }

    #[test]
    fn test_non_posix_login_shell_falls_back_to_sh() {
        let shell = posix_default_shell(Some(OsString::from("/usr/bin/fish")));
        assert_eq!(shell.path, PathBuf::from("/bin/sh"));
        assert_eq!(shell.name, "sh");
        assert_eq!(shell.dialect, ShellDialect::DoubleQuote);

        let shell = posix_default_shell(Some(OsString::from("/usr/bin/zsh")));
        assert_eq!(shell.path, PathBuf::from("/usr/bin/zsh"));
        assert_eq!(shell.name, "zsh");

        assert_eq!(posix_default_shell(None).path, PathBuf::from("/bin/sh"));
        assert_eq!(posix_default_shell(Some(OsString::new())).path, PathBuf::from("/bin/sh"));
    }

    #[test]
    fn test_custom_shell_with_unknown_quoting_needs_a_dialect() {
        let mut custom = BTreeMap::new();
        custom.insert(
            "fish".to_string(),
            ShellConfig {
                path: "/usr/bin/fish".to_string(),
                args: None,
                dialect: None,
            },
        );
        let result = resolve_shell(Some("fish"), Platform::Linux, &custom);
        assert!(matches!(result, Err(ShellError::UnknownDialect { name, .. }) if name == "fish"));

        custom.insert(
            "fish".to_string(),
            ShellConfig {
                path: "/usr/bin/fish".to_string(),
                args: Some(vec!["-c".to_string()]),
                dialect: Some(ShellDialect::DoubleQuote),
            },
        );
        assert!(resolve_shell(Some("fish"), Platform::Linux, &custom).is_ok());
    }
}
