// src/output/dispatcher.rs

use super::channels::{OutputSink, Presentation};
use crate::{
    host::SinkError,
    models::{IgnoreErrorCodes, OutputChannel, OutputChannelOrder, OutputChannels},
    system::executor::{ExecutionOutcome, ExecutionResult},
};

/// One sink call: `text` goes to `channel`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub channel: OutputChannel,
    pub text: String,
    pub presentation: Presentation,
}

/// Decides which text goes to which channel, without delivering anything.
///
/// - A launch failure produces nothing; it is reported by the caller.
/// - One trailing newline is removed from each stream, and empty streams are skipped.
/// - stderr of a non-zero exit code in the ignore list is dropped.
/// - A failure with empty stderr gets a message naming the exit code.
/// - Both streams on the same channel become a single delivery, joined in `order`.
pub fn plan_dispatch(
    result: &ExecutionResult,
    ignore_codes: &IgnoreErrorCodes,
    channels: &OutputChannels,
    order: OutputChannelOrder,
) -> Vec<Delivery> {
    let outcome = result.outcome(ignore_codes);
    if outcome == ExecutionOutcome::LaunchFailed {
        return Vec::new();
    }

    let stdout = trim_trailing_newline(&result.stdout);
    let stderr = if result.is_ignored_failure(ignore_codes) {
        String::new()
    } else if outcome == ExecutionOutcome::Failed && result.stderr.trim().is_empty() {
        match result.exit_code {
            Some(code) => format!("Shell command exited with code {}.", code),
            None => "Shell command was terminated without an exit code.".to_string(),
        }
    } else {
        trim_trailing_newline(&result.stderr).to_string()
    };
    let stderr_presentation = if outcome == ExecutionOutcome::Failed {
        Presentation::Error
    } else {
        Presentation::Normal
    };

    let stdout_part = (!stdout.is_empty()).then(|| (stdout.to_string(), Presentation::Normal));
    let stderr_part = (!stderr.is_empty()).then_some((stderr, stderr_presentation));

    let (first, first_channel, second, second_channel) = match order {
        OutputChannelOrder::StdoutFirst => {
            (stdout_part, &channels.stdout, stderr_part, &channels.stderr)
        }
        OutputChannelOrder::StderrFirst => {
            (stderr_part, &channels.stderr, stdout_part, &channels.stdout)
        }
    };

    let mut deliveries = Vec::new();
    if first_channel == second_channel {
        let joined = match (first, second) {
            (Some((a, pa)), Some((b, pb))) => Some((format!("{}\n{}", a, b), pa.max(pb))),
            (Some(part), None) | (None, Some(part)) => Some(part),
            (None, None) => None,
        };
        if let Some((text, presentation)) = joined {
            deliveries.push(Delivery {
                channel: first_channel.clone(),
                text,
                presentation,
            });
        }
    } else {
        for (part, channel) in [(first, first_channel), (second, second_channel)] {
            if let Some((text, presentation)) = part {
                deliveries.push(Delivery {
                    channel: channel.clone(),
                    text,
                    presentation,
                });
            }
        }
    }

    deliveries.retain(|d| d.channel != OutputChannel::Ignore);
    deliveries
}

/// Plans and performs the deliveries. A failing sink does not stop the others;
/// every failure is returned.
pub async fn dispatch(
    result: &ExecutionResult,
    ignore_codes: &IgnoreErrorCodes,
    channels: &OutputChannels,
    order: OutputChannelOrder,
    sink: &dyn OutputSink,
) -> Vec<SinkError> {
    let mut errors = Vec::new();
    for delivery in plan_dispatch(result, ignore_codes, channels, order) {
        if let Err(e) = sink
            .accept(&delivery.channel, &delivery.text, delivery.presentation)
            .await
        {
            log::debug!("Delivery to {:?} failed: {}", delivery.channel, e);
            errors.push(e);
        }
    }
    errors
}

fn trim_trailing_newline(text: &str) -> &str {
    text.strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        host::memory::{HostEvent, MemoryHost},
        output::channels::HostSink,
    };
    use pretty_assertions::assert_eq;

    fn result(code: i32, stdout: &str, stderr: &str) -> ExecutionResult {
        ExecutionResult {
            exit_code: Some(code),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            launch_error: None,
        }
    }

    fn same(channel: OutputChannel) -> OutputChannels {
        OutputChannels {
            stdout: channel.clone(),
            stderr: channel,
        }
    }

    fn codes(list: &[u32]) -> IgnoreErrorCodes {
        list.iter().copied().collect()
    }

    #[test]
    fn test_ignored_exit_code_drops_stderr_but_keeps_stdout() {
        let result = result(2, "ok", "warn");
        let plan = plan_dispatch(
            &result,
            &codes(&[2, 3]),
            &same(OutputChannel::Notification),
            OutputChannelOrder::StdoutFirst,
        );
        assert_eq!(
            plan,
            vec![Delivery {
                channel: OutputChannel::Notification,
                text: "ok".to_string(),
                presentation: Presentation::Normal,
            }]
        );
        assert_eq!(result.exit_code, Some(2));
    }

    #[test]
    fn test_same_channel_joins_in_order() {
        let result = result(1, "out\n", "err\n");
        let plan = plan_dispatch(
            &result,
            &codes(&[]),
            &same(OutputChannel::Notification),
            OutputChannelOrder::StderrFirst,
        );
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].text, "err\nout");
        assert_eq!(plan[0].presentation, Presentation::Error);
    }

    #[test]
    fn test_different_channels_are_independent() {
        let channels = OutputChannels {
            stdout: OutputChannel::Clipboard,
            stderr: OutputChannel::Notification,
        };
        let plan = plan_dispatch(
            &result(0, "data\n\n", "note"),
            &codes(&[]),
            &channels,
            OutputChannelOrder::StdoutFirst,
        );
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].channel, OutputChannel::Clipboard);
        assert_eq!(plan[0].text, "data\n");
        assert_eq!(plan[1].presentation, Presentation::Normal);
    }

    #[test]
    fn test_failure_without_stderr_gets_a_message() {
        let plan = plan_dispatch(
            &result(4, "", ""),
            &codes(&[]),
            &OutputChannels::default(),
            OutputChannelOrder::StdoutFirst,
        );
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].text, "Shell command exited with code 4.");
        assert_eq!(plan[0].presentation, Presentation::Error);
    }

    #[test]
    fn test_empty_and_ignored_channels_are_skipped() {
        let channels = OutputChannels {
            stdout: OutputChannel::Ignore,
            stderr: OutputChannel::Notification,
        };
        assert!(
            plan_dispatch(&result(0, "x", "\n"), &codes(&[]), &channels, OutputChannelOrder::StdoutFirst)
                .is_empty()
        );
    }

    #[test]
    fn test_launch_failure_dispatches_nothing() {
        let failed = ExecutionResult::launch_failed("no such shell");
        assert!(
            plan_dispatch(
                &failed,
                &codes(&[]),
                &OutputChannels::default(),
                OutputChannelOrder::StdoutFirst
            )
            .is_empty()
        );
    }

    #[tokio::test]
    async fn test_dispatch_collects_sink_errors() {
        let host = MemoryHost::new("/vault");
        let channels = OutputChannels {
            stdout: OutputChannel::CurrentFileTop,
            stderr: OutputChannel::Notification,
        };
        let errors = dispatch(
            &result(1, "text", "bad"),
            &codes(&[]),
            &channels,
            OutputChannelOrder::StdoutFirst,
            &HostSink::new(&host),
        )
        .await;
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], SinkError::NoActiveFile));
        assert_eq!(host.events(), vec![HostEvent::Error("bad".to_string())]);
    }
}
