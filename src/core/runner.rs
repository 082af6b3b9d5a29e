//! # Runner
//!
//! Runs one shell command from start to finish:
//!
//! 1. pick the command text for the current platform
//! 2. select the shell
//! 3. parse the template and resolve its variables
//! 4. escape and compose the final command string
//! 5. ask for confirmation, if the command wants it
//! 6. execute it
//! 7. hand the output to the configured channels
//!
//! Everything up to step 5 happens before any process exists; a failure there
//! is returned as a [`RunError`] and nothing is executed. Launch failures and
//! output-channel failures are reported through the host.

use crate::{
    constants::{ENV_COMMAND_ID, ENV_EVENT, ENV_VAULT_PATH, MAX_REFEED_DEPTH},
    core::{
        escaper,
        events::EventData,
        parser::{self, ParseError},
        paths,
        resolver::{self, ResolutionError},
        variables::{CustomVariableValues, RegistryError, VariableContext, VariableRegistry, custom},
    },
    dev_utils::BlockTimer,
    host::{Host, SinkError},
    models::{OutputChannel, ShellCommandEntry, ShellCommandsConfig},
    output::{HostSink, OutputSink, Presentation, dispatch},
    system::{
        executor::{self, ExecutionOutcome, ExecutionResult},
        shell::{self, Platform, Shell, ShellError},
    },
};
use async_trait::async_trait;
use std::{collections::BTreeMap, path::PathBuf, sync::Arc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("No shell command with id or alias '{0}'.")]
    UnknownCommand(String),
    #[error("Shell command '{id}' has no command text for {platform}.")]
    EmptyCommand { id: String, platform: Platform },
    #[error(transparent)]
    Shell(#[from] ShellError),
    #[error("Invalid command template: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Resolution(ResolutionError),
    #[error("Shell command '{id}' was cancelled.")]
    Cancelled { id: String },
    #[error("Execution of '{id}' was declined.")]
    Declined { id: String },
    #[error("Invalid working directory for '{id}': {message}")]
    WorkingDirectory { id: String, message: String },
    #[error("Output was passed on more than {max} times; stopping before '{id}'.", max = MAX_REFEED_DEPTH)]
    RefeedDepthExceeded { id: String },
}

impl RunError {
    /// Errors the user asked not to be told about, or caused themselves.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Cancelled { .. } | Self::Declined { .. })
    }
}

/// Why a command runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunTrigger {
    pub event: Option<EventData>,
    /// Output handed over by another shell command.
    pub piped_output: Option<String>,
    /// How many shell commands passed output along before this one.
    pub depth: usize,
}

impl RunTrigger {
    /// Started directly by the user.
    pub fn manual() -> Self {
        Self::default()
    }

    pub fn for_event(event: EventData) -> Self {
        Self {
            event: Some(event),
            ..Self::default()
        }
    }

    fn refeed(&self, output: &str) -> Self {
        Self {
            event: self.event.clone(),
            piped_output: Some(output.to_string()),
            depth: self.depth + 1,
        }
    }
}

/// A command that is ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCommand {
    pub command_id: String,
    pub shell: Shell,
    pub command: String,
    pub working_directory: PathBuf,
}

#[derive(Debug)]
pub struct RunReport {
    pub prepared: PreparedCommand,
    pub result: ExecutionResult,
    pub outcome: ExecutionOutcome,
    /// Output channels that could not take their output. Already reported to the host.
    pub sink_errors: Vec<SinkError>,
}

pub struct ShellCommandRunner {
    config: Arc<ShellCommandsConfig>,
    registry: Arc<VariableRegistry>,
    host: Arc<dyn Host>,
    custom_values: CustomVariableValues,
    platform: Platform,
}

impl std::fmt::Debug for ShellCommandRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellCommandRunner")
            .field("commands", &self.config.commands.len())
            .field("variables", &self.registry.len())
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

impl ShellCommandRunner {
    /// A runner with every built-in variable plus the configuration's custom
    /// variables, holding their initial values.
    pub fn new(config: Arc<ShellCommandsConfig>, host: Arc<dyn Host>) -> Result<Self, RegistryError> {
        let registry = VariableRegistry::from_config(&config)?;
        let custom_values = custom::initial_values(&config);
        Ok(Self {
            config,
            registry: Arc::new(registry),
            host,
            custom_values,
            platform: Platform::current(),
        })
    }

    pub fn with_custom_values(mut self, values: CustomVariableValues) -> Self {
        self.custom_values = values;
        self
    }

    pub fn config(&self) -> &ShellCommandsConfig {
        &self.config
    }

    pub fn registry(&self) -> &VariableRegistry {
        &self.registry
    }

    /// Custom variable values at the start of every run.
    pub fn custom_values(&self) -> &CustomVariableValues {
        &self.custom_values
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Finds a command by id or alias.
    pub fn find(&self, key: &str) -> Result<&ShellCommandEntry, RunError> {
        self.config
            .find_command(key)
            .ok_or_else(|| RunError::UnknownCommand(key.to_string()))
    }

    /// Steps 1-4: everything that happens before a process is started.
    pub async fn prepare(
        &self,
        entry: &ShellCommandEntry,
        trigger: &RunTrigger,
    ) -> Result<PreparedCommand, RunError> {
        if trigger.depth > MAX_REFEED_DEPTH {
            return Err(RunError::RefeedDepthExceeded {
                id: entry.id.clone(),
            });
        }

        // 1. Command text
        let template = entry
            .platform_commands
            .for_platform(self.platform)
            .ok_or_else(|| RunError::EmptyCommand {
                id: entry.id.clone(),
                platform: self.platform,
            })?;

        // 2. Shell
        let shell = shell::resolve_shell(
            entry.shells.for_platform(self.platform),
            self.platform,
            &self.config.shells,
        )?;

        // 3. Parse + resolve
        let tokens = parser::parse(template)?;
        let ctx = VariableContext {
            host: self.host.as_ref(),
            shell: &shell,
            event: trigger.event.as_ref(),
            output: trigger.piped_output.as_deref(),
            custom_values: &self.custom_values,
        };
        let segments = resolver::resolve(&tokens, &self.registry, &ctx, &entry.variable_default_values)
            .await
            .map_err(|e| {
                if e.is_silent() {
                    log::debug!("'{}' cancelled silently: {}", entry.id, e);
                    RunError::Cancelled {
                        id: entry.id.clone(),
                    }
                } else {
                    RunError::Resolution(e)
                }
            })?;

        // 4. Compose
        let command = escaper::compose(&segments, shell.dialect);

        let working_directory = paths::resolve_working_directory(
            self.host.vault_path(),
            entry.working_directory.as_deref(),
            self.config.working_directory.as_deref(),
        )
        .map_err(|e| RunError::WorkingDirectory {
            id: entry.id.clone(),
            message: e.to_string(),
        })?;

        log::debug!("Prepared '{}' for {}: {}", entry.id, shell.name, command);
        Ok(PreparedCommand {
            command_id: entry.id.clone(),
            shell,
            command,
            working_directory,
        })
    }

    /// Runs `entry` to completion and dispatches its output.
    pub async fn run(
        &self,
        entry: &ShellCommandEntry,
        trigger: &RunTrigger,
    ) -> Result<RunReport, RunError> {
        let _timer = BlockTimer::new(format!("run {}", entry.id));
        let prepared = self.prepare(entry, trigger).await?;

        // 5. Confirmation
        if entry.confirm_execution {
            let prompt = format!(
                "Execute '{}'?\n  {}",
                entry.display_name(),
                prepared.command
            );
            if !self.host.confirm(&prompt).await {
                return Err(RunError::Declined {
                    id: entry.id.clone(),
                });
            }
        }

        // 6. Execution
        let env_vars = self.environment_for(entry, trigger);
        let result = executor::execute(
            &prepared.shell,
            &prepared.command,
            &prepared.working_directory,
            &env_vars,
        )
        .await;
        let outcome = result.outcome(&entry.ignore_error_codes);
        log::debug!("'{}' finished: {:?} (exit code {:?})", entry.id, outcome, result.exit_code);

        if let Some(message) = &result.launch_error {
            self.host.notify_error(message).await;
        }

        // 7. Output
        let sink = RefeedSink {
            runner: self,
            host_sink: HostSink::new(self.host.as_ref()),
            trigger,
        };
        let sink_errors = dispatch(
            &result,
            &entry.ignore_error_codes,
            &entry.output_channels,
            entry.output_channel_order,
            &sink,
        )
        .await;
        for error in &sink_errors {
            self.host.notify_error(&error.to_string()).await;
        }

        Ok(RunReport {
            prepared,
            result,
            outcome,
            sink_errors,
        })
    }

    fn environment_for(&self, entry: &ShellCommandEntry, trigger: &RunTrigger) -> BTreeMap<String, String> {
        let mut env_vars = BTreeMap::new();
        env_vars.insert(ENV_COMMAND_ID.to_string(), entry.id.clone());
        env_vars.insert(
            ENV_VAULT_PATH.to_string(),
            paths::display_path(self.host.vault_path()),
        );
        if let Some(event) = &trigger.event {
            env_vars.insert(ENV_EVENT.to_string(), event.event.to_string());
        }
        env_vars
    }
}

/// Output sink that runs another shell command for `shell-command` channels
/// and leaves everything else to the host.
struct RefeedSink<'a> {
    runner: &'a ShellCommandRunner,
    host_sink: HostSink<'a>,
    trigger: &'a RunTrigger,
}

#[async_trait]
impl OutputSink for RefeedSink<'_> {
    async fn accept(
        &self,
        channel: &OutputChannel,
        text: &str,
        presentation: Presentation,
    ) -> Result<(), SinkError> {
        let OutputChannel::ShellCommand(id) = channel else {
            return self.host_sink.accept(channel, text, presentation).await;
        };
        let entry = self.runner.find(id).map_err(|e| SinkError::Refeed {
            id: id.clone(),
            message: e.to_string(),
        })?;
        log::debug!("Passing {} byte(s) of output to '{}'", text.len(), id);
        match self.runner.run(entry, &self.trigger.refeed(text)).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_silent() => Ok(()),
            Err(e) => Err(SinkError::Refeed {
                id: id.clone(),
                message: e.to_string(),
            }),
        }
    }
}
