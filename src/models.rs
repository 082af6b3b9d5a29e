// src/models.rs

use crate::core::{config_loader, events::ShellCommandEvent};
use crate::system::shell::{Platform, ShellDialect};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// --- DEFAULT VALUE POLICIES ---

/// What to do when a variable cannot produce a value, at the global (per-variable) scope.
///
/// Has no `Inherit` variant: the global scope is the end
/// of the lookup chain.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum DefaultValue {
    /// Abort the command and show the variable's error message.
    #[default]
    ShowErrors,
    /// Abort the command without showing anything.
    CancelSilently,
    /// Substitute the given text and carry on.
    Value(String),
}

/// The same policy at the per-command scope, where `Inherit` defers to the global scope.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum CommandDefaultValue {
    #[default]
    Inherit,
    ShowErrors,
    CancelSilently,
    Value(String),
}

impl CommandDefaultValue {
    /// The concrete policy, or `None` for `Inherit`.
    pub fn as_policy(&self) -> Option<DefaultValue> {
        match self {
            Self::Inherit => None,
            Self::ShowErrors => Some(DefaultValue::ShowErrors),
            Self::CancelSilently => Some(DefaultValue::CancelSilently),
            Self::Value(v) => Some(DefaultValue::Value(v.clone())),
        }
    }
}

/// Global settings for one variable (`[variables.<name>]`).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct VariableSettings {
    #[serde(default)]
    pub default_value: Option<DefaultValue>,
}

/// A user-defined variable (`[custom_variables._name]`).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CustomVariableConfig {
    /// The value the variable holds when a run starts. Unset means unavailable.
    #[serde(default)]
    pub initial_value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

// --- OUTPUT ---

/// Where a stream of a finished command goes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OutputChannel {
    /// Discard the output.
    Ignore,
    /// Show the output as a notice.
    #[default]
    Notification,
    StatusBar,
    /// Insert at the caret of the active file, replacing the selection if there is one.
    CurrentFileCaret,
    CurrentFileTop,
    CurrentFileBottom,
    /// Replace the line the caret is on.
    CurrentLine,
    ReplaceSelection,
    Clipboard,
    /// Run another shell command with this output available as `{{output}}`.
    ShellCommand(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct OutputChannels {
    #[serde(default)]
    pub stdout: OutputChannel,
    #[serde(default)]
    pub stderr: OutputChannel,
}

/// Which stream comes first when both streams go to the same channel.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OutputChannelOrder {
    #[default]
    StdoutFirst,
    StderrFirst,
}

// --- IGNORE LIST ---

/// Exit codes that do not count as a failure. Always non-negative.
///
/// Invalid entries are dropped while the configuration is read, so nothing at
/// execution time ever sees them.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(from = "RawIgnoreErrorCodes", into = "Vec<u32>")]
pub struct IgnoreErrorCodes(BTreeSet<u32>);

impl IgnoreErrorCodes {
    pub fn contains(&self, exit_code: i32) -> bool {
        u32::try_from(exit_code).is_ok_and(|code| self.0.contains(&code))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &u32> {
        self.0.iter()
    }
}

impl FromIterator<u32> for IgnoreErrorCodes {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<IgnoreErrorCodes> for Vec<u32> {
    fn from(codes: IgnoreErrorCodes) -> Self {
        codes.0.into_iter().collect()
    }
}

/// Accepts either `[1, 2]` or `"1, 2"` in the configuration file.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum RawIgnoreErrorCodes {
    List(Vec<RawExitCode>),
    Text(String),
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum RawExitCode {
    Number(i64),
    Text(String),
}

impl From<RawIgnoreErrorCodes> for IgnoreErrorCodes {
    fn from(raw: RawIgnoreErrorCodes) -> Self {
        match raw {
            RawIgnoreErrorCodes::Text(text) => config_loader::parse_ignore_error_codes(&text),
            RawIgnoreErrorCodes::List(items) => {
                let text = items
                    .into_iter()
                    .map(|item| match item {
                        RawExitCode::Number(n) => n.to_string(),
                        RawExitCode::Text(s) => s,
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                config_loader::parse_ignore_error_codes(&text)
            }
        }
    }
}

// --- PLATFORM TABLES ---

/// Command text per platform, with `default` as the fallback.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PlatformCommands {
    #[serde(default)]
    pub default: Option<String>,
    pub windows: Option<String>,
    pub linux: Option<String>,
    pub macos: Option<String>,
}

impl PlatformCommands {
    /// The command text for `platform`, falling back to `default`. Blank text counts as absent.
    pub fn for_platform(&self, platform: Platform) -> Option<&str> {
        let specific = match platform {
            Platform::Windows => self.windows.as_deref(),
            Platform::Linux => self.linux.as_deref(),
            Platform::Macos => self.macos.as_deref(),
        };
        specific
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.default.as_deref().filter(|s| !s.trim().is_empty()))
    }
}

/// Shell selection per platform. Absent means the platform's default shell.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PlatformShells {
    pub windows: Option<String>,
    pub linux: Option<String>,
    pub macos: Option<String>,
}

impl PlatformShells {
    pub fn for_platform(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::Windows => self.windows.as_deref(),
            Platform::Linux => self.linux.as_deref(),
            Platform::Macos => self.macos.as_deref(),
        }
    }
}

/// A user-defined shell (`[shells.<name>]`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ShellConfig {
    /// Path to the binary; `~` and `$VAR` are expanded.
    pub path: String,
    /// Arguments placed before the command string. Defaults to what the dialect expects.
    #[serde(default)]
    pub args: Option<Vec<String>>,
    /// Quoting rules. Inferred from the binary name when absent.
    #[serde(default)]
    pub dialect: Option<ShellDialect>,
}

// --- SHELL COMMANDS ---

/// A user-defined shell command.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ShellCommandEntry {
    pub id: String,
    #[serde(default)]
    pub alias: Option<String>,
    pub platform_commands: PlatformCommands,
    #[serde(default)]
    pub shells: PlatformShells,
    #[serde(default)]
    pub confirm_execution: bool,
    #[serde(default)]
    pub ignore_error_codes: IgnoreErrorCodes,
    #[serde(default)]
    pub output_channels: OutputChannels,
    #[serde(default)]
    pub output_channel_order: OutputChannelOrder,
    #[serde(default)]
    pub variable_default_values: BTreeMap<String, CommandDefaultValue>,
    #[serde(default)]
    pub events: BTreeSet<ShellCommandEvent>,
    /// Relative paths are resolved against the vault root.
    #[serde(default)]
    pub working_directory: Option<String>,
}

impl ShellCommandEntry {
    /// A command with only default command text and every other setting at its default.
    pub fn new(id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            alias: None,
            platform_commands: PlatformCommands {
                default: Some(command.into()),
                ..Default::default()
            },
            shells: PlatformShells::default(),
            confirm_execution: false,
            ignore_error_codes: IgnoreErrorCodes::default(),
            output_channels: OutputChannels::default(),
            output_channel_order: OutputChannelOrder::default(),
            variable_default_values: BTreeMap::new(),
            events: BTreeSet::new(),
            working_directory: None,
        }
    }

    /// The name shown to the user: the alias if set, otherwise the id.
    pub fn display_name(&self) -> &str {
        self.alias
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(&self.id)
    }
}

/// The whole configuration document.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ShellCommandsConfig {
    /// Working directory used when a command does not set its own.
    #[serde(default)]
    pub working_directory: Option<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, VariableSettings>,
    #[serde(default)]
    pub custom_variables: BTreeMap<String, CustomVariableConfig>,
    #[serde(default)]
    pub shells: BTreeMap<String, ShellConfig>,
    #[serde(default)]
    pub commands: Vec<ShellCommandEntry>,
}

impl ShellCommandsConfig {
    /// Finds a command by id, or failing that by alias.
    pub fn find_command(&self, key: &str) -> Option<&ShellCommandEntry> {
        self.commands
            .iter()
            .find(|c| c.id == key)
            .or_else(|| self.commands.iter().find(|c| c.alias.as_deref() == Some(key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_commands_fall_back_to_default() {
        let commands = PlatformCommands {
            default: Some("ls".to_string()),
            windows: Some("dir".to_string()),
            linux: Some("   ".to_string()),
            macos: None,
        };
        assert_eq!(commands.for_platform(Platform::Windows), Some("dir"));
        assert_eq!(commands.for_platform(Platform::Linux), Some("ls"));
        assert_eq!(commands.for_platform(Platform::Macos), Some("ls"));
    }

    #[test]
    fn test_ignore_error_codes_accept_list_and_text() {
        let entry: ShellCommandEntry = toml::from_str(
            r#"
            id = "a"
            platform_commands = { default = "true" }
            ignore_error_codes = [1, -4, 2]
            "#,
        )
        .unwrap();
        assert_eq!(entry.ignore_error_codes.iter().copied().collect::<Vec<_>>(), vec![1, 2]);

        let entry: ShellCommandEntry = toml::from_str(
            r#"
            id = "b"
            platform_commands = { default = "true" }
            ignore_error_codes = "3, x, 7"
            "#,
        )
        .unwrap();
        assert_eq!(entry.ignore_error_codes.iter().copied().collect::<Vec<_>>(), vec![3, 7]);
    }

    #[test]
    fn test_ignore_error_codes_contains_rejects_negative_codes() {
        let codes = IgnoreErrorCodes::from_iter([1, 2]);
        assert!(codes.contains(1));
        assert!(!codes.contains(-1));
    }

    #[test]
    fn test_output_channel_deserialization() {
        let channels: OutputChannels = toml::from_str(
            r#"
            stdout = "current-file-caret"
            stderr = { shell-command = "log-errors" }
            "#,
        )
        .unwrap();
        assert_eq!(channels.stdout, OutputChannel::CurrentFileCaret);
        assert_eq!(channels.stderr, OutputChannel::ShellCommand("log-errors".to_string()));
    }

    #[test]
    fn test_global_default_value_rejects_inherit() {
        let result: Result<VariableSettings, _> =
            toml::from_str(r#"default_value = { type = "inherit" }"#);
        assert!(result.is_err());

        let settings: VariableSettings =
            toml::from_str(r#"default_value = { type = "value", value = "untitled" }"#).unwrap();
        assert_eq!(settings.default_value, Some(DefaultValue::Value("untitled".to_string())));
    }

    #[test]
    fn test_command_default_value_variants() {
        let map: BTreeMap<String, CommandDefaultValue> = toml::from_str(
            r#"
            file_name = { type = "inherit" }
            selection = { type = "cancel-silently" }
            clipboard = { type = "value", value = "" }
            "#,
        )
        .unwrap();
        assert_eq!(map.get("file_name"), Some(&CommandDefaultValue::Inherit));
        assert_eq!(
            map.get("selection").and_then(CommandDefaultValue::as_policy),
            Some(DefaultValue::CancelSilently)
        );
        assert_eq!(
            map.get("clipboard"),
            Some(&CommandDefaultValue::Value(String::new()))
        );
    }

    #[test]
    fn test_unknown_field_in_command_is_rejected() {
        let result: Result<ShellCommandEntry, _> = toml::from_str(
            r#"
            id = "typo"
            platform_commands = { default = "true" }
            ignore_error_code = [1]
            "#,
        );
        let error_msg = result.unwrap_err().to_string();
        assert!(
            error_msg.contains("unknown field `ignore_error_code`"),
            "Error message was: {}",
            error_msg
        );
    }

    #[test]
    fn test_find_command_by_alias() {
        let mut entry = ShellCommandEntry::new("id-1", "echo hi");
        entry.alias = Some("Say hi".to_string());
        let config = ShellCommandsConfig {
            commands: vec![entry],
            ..Default::default()
        };
        assert_eq!(config.find_command("Say hi").map(|c| c.id.as_str()), Some("id-1"));
        assert_eq!(config.find_command("id-1").map(|c| c.display_name()), Some("Say hi"));
        assert!(config.find_command("missing").is_none());
    }
}
