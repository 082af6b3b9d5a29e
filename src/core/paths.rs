// src/core/paths.rs

use crate::constants::{CONFIG_DIR_NAME, CONFIG_FILENAME};
use anyhow::{Result, anyhow};
use lazy_static::lazy_static;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

lazy_static! {
    static ref CONFIG_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
}

/// Returns the path to the configuration directory (`~/.config/shell-commands`).
///
/// This function is memoized: the first call computes and caches the path,
/// subsequent calls return the cached value instantly. Unlike a write path, it
/// does not create the directory; a missing file is reported when it is read.
pub fn get_config_dir() -> Result<PathBuf, PathError> {
    let mut cached_path_guard = CONFIG_DIR.lock().unwrap_or_else(PoisonError::into_inner);

    if let Some(path) = &*cached_path_guard {
        return Ok(path.clone());
    }

    let config_path = dirs::config_dir()
        .ok_or(PathError::ConfigDirNotFound)?
        .join(CONFIG_DIR_NAME);

    *cached_path_guard = Some(config_path.clone());
    Ok(config_path)
}

/// Returns the path of the default `config.toml`.
pub fn get_default_config_path() -> Result<PathBuf, PathError> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILENAME))
}

/// Expands `~` and environment variables (`$VAR`, `${VAR}`) in a configured path.
pub fn expand_path(template: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(template)
        .map_err(|e| anyhow!("Failed to expand path '{}': {}", template, e))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

/// Determines the directory a command runs in.
///
/// Precedence: the command's own setting, then the global setting, then the
/// vault root. Relative settings are taken relative to the vault root.
pub fn resolve_working_directory(
    vault: &Path,
    command_setting: Option<&str>,
    global_setting: Option<&str>,
) -> Result<PathBuf> {
    let setting = command_setting
        .filter(|s| !s.trim().is_empty())
        .or_else(|| global_setting.filter(|s| !s.trim().is_empty()));

    match setting {
        None => Ok(vault.to_path_buf()),
        Some(template) => {
            let expanded = expand_path(template.trim())?;
            if expanded.is_absolute() {
                Ok(expanded)
            } else {
                Ok(vault.join(expanded))
            }
        }
    }
}

/// Renders a path the way it should appear in variable values: with Windows
/// verbatim prefixes removed.
pub fn display_path(path: &Path) -> String {
    dunce::simplified(path).to_string_lossy().into_owned()
}
