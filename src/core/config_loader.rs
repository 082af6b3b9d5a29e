//! # Config Loader
//!
//! Reads the TOML configuration document and validates everything that can be
//! checked before a command runs: unique command ids, well-formed custom
//! variable names, known variables in `[variables]` and existing targets of
//! `shell-command` output channels.
//!
//! The rest of the crate treats a loaded [`ShellCommandsConfig`] as already
//! validated.

use crate::{
    constants::CUSTOM_VARIABLE_PREFIX,
    core::variables::builtin,
    models::{IgnoreErrorCodes, OutputChannel, ShellCommandsConfig},
};
use lazy_static::lazy_static;
use regex::Regex;
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

lazy_static! {
    static ref CUSTOM_VARIABLE_NAME_RE: Regex = Regex::new(r"^_[A-Za-z0-9_]+$").unwrap();
    static ref EXIT_CODE_RE: Regex = Regex::new(r"^\d+$").unwrap();
}

/// Represents errors that can occur while loading the configuration document.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read configuration file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML file at '{path}': {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Shell command id '{0}' is used more than once.")]
    DuplicateCommandId(String),
    #[error("Shell command ids must not be empty.")]
    EmptyCommandId,
    #[error(
        "Custom variable '{0}' must start with '{prefix}' and contain only letters, digits and underscores.",
        prefix = CUSTOM_VARIABLE_PREFIX
    )]
    InvalidCustomVariableName(String),
    #[error("[variables.{0}] refers to a variable that does not exist.")]
    UnknownVariable(String),
    #[error("Shell command '{command}' sends output to unknown shell command '{target}'.")]
    UnknownOutputTarget { command: String, target: String },
}

/// Reads and validates the configuration file at `path`.
pub fn load_config(path: &Path) -> Result<ShellCommandsConfig, ConfigError> {
    log::debug!("Loading configuration from '{}'", path.display());
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content, path)
}

/// Parses and validates configuration text. `origin` is only used in error messages.
pub fn parse_config(content: &str, origin: &Path) -> Result<ShellCommandsConfig, ConfigError> {
    let config: ShellCommandsConfig =
        toml::from_str(content).map_err(|source| ConfigError::TomlParse {
            path: origin.to_path_buf(),
            source,
        })?;
    validate_config(&config)?;
    log::debug!(
        "Configuration loaded: {} command(s), {} custom variable(s).",
        config.commands.len(),
        config.custom_variables.len()
    );
    Ok(config)
}

/// Checks the cross-references a TOML schema alone cannot express.
pub fn validate_config(config: &ShellCommandsConfig) -> Result<(), ConfigError> {
    let mut ids = HashSet::new();
    for command in &config.commands {
        if command.id.trim().is_empty() {
            return Err(ConfigError::EmptyCommandId);
        }
        if !ids.insert(command.id.as_str()) {
            return Err(ConfigError::DuplicateCommandId(command.id.clone()));
        }
    }

    for name in config.custom_variables.keys() {
        if !is_valid_custom_variable_name(name) {
            return Err(ConfigError::InvalidCustomVariableName(name.clone()));
        }
    }

    for name in config.variables.keys() {
        if !builtin::is_builtin_name(name) && !config.custom_variables.contains_key(name) {
            return Err(ConfigError::UnknownVariable(name.clone()));
        }
    }

    for command in &config.commands {
        for channel in [&command.output_channels.stdout, &command.output_channels.stderr] {
            if let OutputChannel::ShellCommand(target) = channel
                && config.find_command(target).is_none()
            {
                return Err(ConfigError::UnknownOutputTarget {
                    command: command.id.clone(),
                    target: target.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Whether `name` is acceptable as a user-defined variable identifier (`_name`).
pub fn is_valid_custom_variable_name(name: &str) -> bool {
    CUSTOM_VARIABLE_NAME_RE.is_match(name)
}

/// Parses a comma separated list of exit codes as typed by the user.
///
/// Entries that are not non-negative integers are discarded with a warning,
/// so the resulting set is always safe to use at execution time.
pub fn parse_ignore_error_codes(text: &str) -> IgnoreErrorCodes {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            let parsed = if EXIT_CODE_RE.is_match(s) {
                s.parse::<u32>().ok()
            } else {
                None
            };
            if parsed.is_none() {
                log::warn!("Discarding invalid ignored error code '{}'.", s);
            }
            parsed
        })
        .collect()
}
