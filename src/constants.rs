// src/constants.rs

/// The name of the directory holding the configuration (inside the system config dir).
pub const CONFIG_DIR_NAME: &str = "shell-commands";

/// The name of the main configuration file (inside the config directory).
pub const CONFIG_FILENAME: &str = "config.toml";

/// Environment variable exported to every spawned command: the id of the running command.
pub const ENV_COMMAND_ID: &str = "SHELL_COMMANDS_ID";

/// Environment variable exported to every spawned command: the vault root.
pub const ENV_VAULT_PATH: &str = "SHELL_COMMANDS_VAULT";

/// Environment variable exported when a command runs because of an event.
pub const ENV_EVENT: &str = "SHELL_COMMANDS_EVENT";

/// Prefix that marks a user-defined (custom) variable, e.g. `{{_project}}`.
pub const CUSTOM_VARIABLE_PREFIX: char = '_';

/// How many times output may be passed from one shell command to the next.
pub const MAX_REFEED_DEPTH: usize = 8;
