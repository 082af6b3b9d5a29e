// src/cli/dispatcher.rs

use anyhow::Result;

use crate::cli::handlers::{self, commons::Session};

// --- Command Definition and Registry ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Run,
    List,
    Preview,
    Trigger,
    Variables,
    Parse,
}

/// Defines a system command and its aliases.
#[derive(Debug)]
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    action: Action,
}

/// The single source of truth for all system commands.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "run",
        aliases: &["exec"],
        action: Action::Run,
    },
    CommandDefinition {
        name: "list",
        aliases: &["ls"],
        action: Action::List,
    },
    CommandDefinition {
        name: "preview",
        aliases: &[],
        action: Action::Preview,
    },
    CommandDefinition {
        name: "trigger",
        aliases: &[],
        action: Action::Trigger,
    },
    CommandDefinition {
        name: "variables",
        aliases: &["vars"],
        action: Action::Variables,
    },
    CommandDefinition {
        name: "parse",
        aliases: &[],
        action: Action::Parse,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Splits the arguments into an action and the arguments for its handler.
///
/// - no arguments: `list`
/// - `<action> [args...]`: that action
/// - `<id> [args...]`: shortcut for `run <id> [args...]`
fn route(all_args: Vec<String>) -> (Action, Vec<String>) {
    let mut args = all_args.into_iter();
    match args.next() {
        None => (Action::List, Vec::new()),
        Some(first) => match find_command(&first) {
            Some(command) => (command.action, args.collect()),
            None => {
                let mut run_args = vec![first];
                run_args.extend(args);
                (Action::Run, run_args)
            }
        },
    }
}

/// The main application dispatcher.
pub async fn dispatch(all_args: Vec<String>, session: &Session) -> Result<()> {
    log::debug!("Dispatching args: {:?}", all_args);
    let (action, handler_args) = route(all_args);

    match action {
        Action::Run => handlers::run::handle(handler_args, session).await,
        Action::List => handlers::list::handle(handler_args, session).await,
        Action::Preview => handlers::preview::handle(handler_args, session).await,
        Action::Trigger => handlers::trigger::handle(handler_args, session).await,
        Action::Variables => handlers::variables::handle(handler_args, session).await,
        Action::Parse => handlers::parse::handle(handler_args, session).await,
    }
}
