// src/system/executor.rs

use crate::{models::IgnoreErrorCodes, system::shell::Shell};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command as TokioCommand;
use tokio::sync::mpsc;

const READ_CHUNK_SIZE: usize = 8192;
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// One event emitted by a running shell process.
///
/// A stream of these is finite: it always ends with exactly one `Exit` or one
/// `LaunchError`, and nothing follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Stdout(String),
    Stderr(String),
    /// The process finished. `None` only when no exit code could be determined.
    Exit(Option<i32>),
    /// The shell could not be spawned at all.
    LaunchError(String),
}

/// Everything a finished (or never started) process produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// `None` when the process could not be started.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub launch_error: Option<String>,
}

/// How an execution is judged for error-reporting purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Succeeded,
    Failed,
    LaunchFailed,
}

impl ExecutionResult {
    pub fn launch_failed(message: impl Into<String>) -> Self {
        Self {
            exit_code: None,
            launch_error: Some(message.into()),
            ..Default::default()
        }
    }

    /// A non-zero exit code is a failure unless it is in the ignore list.
    pub fn outcome(&self, ignore_codes: &IgnoreErrorCodes) -> ExecutionOutcome {
        if self.launch_error.is_some() {
            return ExecutionOutcome::LaunchFailed;
        }
        match self.exit_code {
            Some(0) => ExecutionOutcome::Succeeded,
            Some(code) if ignore_codes.contains(code) => ExecutionOutcome::Succeeded,
            _ => ExecutionOutcome::Failed,
        }
    }

    /// True when the process failed with a code the command asked to ignore.
    pub fn is_ignored_failure(&self, ignore_codes: &IgnoreErrorCodes) -> bool {
        self.launch_error.is_none()
            && self
                .exit_code
                .is_some_and(|code| code != 0 && ignore_codes.contains(code))
    }
}

/// Spawns `command` through `shell` and returns the stream of its events.
///
/// The command string is handed to the shell as a single "execute this" argument,
/// never split into an argv array. Stdout and stderr are read by two independent
/// tasks, so neither stream can block the other.
pub fn spawn_streaming(
    shell: &Shell,
    command: &str,
    cwd: &Path,
    env_vars: &BTreeMap<String, String>,
) -> mpsc::Receiver<ProcessEvent> {
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

    if !cwd.is_dir() {
        let message = format!(
            "Working directory '{}' does not exist or is not a directory.",
            cwd.display()
        );
        // The channel is fresh and has capacity, so this cannot fail.
        let _ = tx.try_send(ProcessEvent::LaunchError(message));
        return rx;
    }

    let clean_cwd = dunce::simplified(cwd);
    let mut cmd = TokioCommand::new(&shell.path);
    cmd.args(&shell.args)
        .arg(command)
        .current_dir(clean_cwd)
        .envs(env_vars)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    log::debug!(
        "Pending -> Running: {} {:?} '{}' (cwd: {})",
        shell.path.display(),
        shell.args,
        command,
        clean_cwd.display()
    );

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            log::debug!("Pending -> LaunchFailed: {}", e);
            let message = format!("Could not start shell '{}': {}", shell.path.display(), e);
            let _ = tx.try_send(ProcessEvent::LaunchError(message));
            return rx;
        }
    };

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    tokio::spawn(async move {
        let stdout_task = stdout.map(|s| tokio::spawn(forward(s, tx.clone(), ProcessEvent::Stdout)));
        let stderr_task = stderr.map(|s| tokio::spawn(forward(s, tx.clone(), ProcessEvent::Stderr)));

        // Drain both readers first so that `Exit` is always the last event.
        if let Some(task) = stdout_task {
            let _ = task.await;
        }
        if let Some(task) = stderr_task {
            let _ = task.await;
        }

        let final_event = match child.wait().await {
            Ok(status) => ProcessEvent::Exit(exit_code_of(status)),
            Err(e) => {
                log::warn!("Failed to wait for child process: {}", e);
                ProcessEvent::Exit(None)
            }
        };
        let _ = tx.send(final_event).await;
    });

    rx
}

/// Runs `command` to completion and collects its output.
pub async fn execute(
    shell: &Shell,
    command: &str,
    cwd: &Path,
    env_vars: &BTreeMap<String, String>,
) -> ExecutionResult {
    let mut events = spawn_streaming(shell, command, cwd, env_vars);
    let mut result = ExecutionResult::default();

    while let Some(event) = events.recv().await {
        match event {
            ProcessEvent::Stdout(chunk) => result.stdout.push_str(&chunk),
            ProcessEvent::Stderr(chunk) => result.stderr.push_str(&chunk),
            ProcessEvent::Exit(code) => {
                log::debug!("Running -> exited with code {:?}", code);
                result.exit_code = code;
                break;
            }
            ProcessEvent::LaunchError(message) => {
                return ExecutionResult::launch_failed(message);
            }
        }
    }

    if log::log_enabled!(log::Level::Trace) {
        log::trace!("stdout: {:?}", result.stdout);
        log::trace!("stderr: {:?}", result.stderr);
    }
    result
}

async fn forward<R>(mut reader: R, tx: mpsc::Sender<ProcessEvent>, wrap: fn(String) -> ProcessEvent)
where
    R: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; READ_CHUNK_SIZE];
    let mut pending = Vec::new();
    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => {
                pending.extend_from_slice(buffer.get(..n).unwrap_or_default());
                let text = take_utf8(&mut pending);
                if !text.is_empty() && tx.send(wrap(text)).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                log::warn!("Error while reading process output: {}", e);
                break;
            }
        }
    }
    if !pending.is_empty() {
        let _ = tx.send(wrap(String::from_utf8_lossy(&pending).into_owned())).await;
    }
}

/// Decodes as much of `pending` as possible, keeping an incomplete trailing
/// UTF-8 sequence for the next chunk.
fn take_utf8(pending: &mut Vec<u8>) -> String {
    match std::str::from_utf8(pending) {
        Ok(text) => {
            let text = text.to_string();
            pending.clear();
            text
        }
        Err(e) if e.error_len().is_none() => {
            let tail = pending.split_off(e.valid_up_to());
            let text = String::from_utf8_lossy(pending).into_owned();
            *pending = tail;
            text
        }
        Err(_) => {
            let text = String::from_utf8_lossy(pending).into_owned();
            pending.clear();
            text
        }
    }
}

#[cfg(unix)]
fn exit_code_of(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    // Mirror the shell convention of 128 + signal number for killed processes.
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
}

#[cfg(not(unix))]
fn exit_code_of(status: ExitStatus) -> Option<i32> {
    status.code()
}
