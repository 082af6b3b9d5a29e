// src/output/channels.rs

use crate::{
    host::{Host, InsertPosition, SinkError},
    models::OutputChannel,
};
use async_trait::async_trait;

/// How the text should look where it ends up. Only notices distinguish the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Presentation {
    Normal,
    /// The text describes a failure.
    Error,
}

/// Something that accepts output for a channel.
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn accept(
        &self,
        channel: &OutputChannel,
        text: &str,
        presentation: Presentation,
    ) -> Result<(), SinkError>;
}

/// Delivers output to the editor. Does not know how to run other shell commands;
/// a `shell-command` channel is rejected.
#[derive(Clone, Copy)]
pub struct HostSink<'a> {
    host: &'a dyn Host,
}

impl<'a> HostSink<'a> {
    pub fn new(host: &'a dyn Host) -> Self {
        Self { host }
    }
}

impl std::fmt::Debug for HostSink<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostSink").finish_non_exhaustive()
    }
}

#[async_trait]
impl OutputSink for HostSink<'_> {
    async fn accept(
        &self,
        channel: &OutputChannel,
        text: &str,
        presentation: Presentation,
    ) -> Result<(), SinkError> {
        log::debug!("Delivering {} byte(s) to {:?}", text.len(), channel);
        let host = self.host;
        match channel {
            OutputChannel::Ignore => Ok(()),
            OutputChannel::Notification => {
                match presentation {
                    Presentation::Normal => host.notify(text).await,
                    Presentation::Error => host.notify_error(text).await,
                }
                Ok(())
            }
            OutputChannel::StatusBar => {
                host.set_status_bar(text).await;
                Ok(())
            }
            OutputChannel::CurrentFileCaret => {
                host.insert_into_active_file(InsertPosition::Caret, text).await
            }
            OutputChannel::CurrentFileTop => {
                host.insert_into_active_file(InsertPosition::Top, text).await
            }
            OutputChannel::CurrentFileBottom => {
                host.insert_into_active_file(InsertPosition::Bottom, text).await
            }
            OutputChannel::CurrentLine => host.replace_current_line(text).await,
            OutputChannel::ReplaceSelection => {
                host.insert_into_active_file(InsertPosition::ReplaceSelection, text)
                    .await
            }
            OutputChannel::Clipboard => host.write_clipboard(text).await,
            OutputChannel::ShellCommand(id) => Err(SinkError::Refeed {
                id: id.clone(),
                message: "no command runner is attached to this output".to_string(),
            }),
        }
    }
}
