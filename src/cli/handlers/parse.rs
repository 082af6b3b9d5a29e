// src/cli/handlers/parse.rs

use anyhow::{Result, bail};
use clap::Parser;
use colored::*;

use super::commons::Session;
use crate::{
    core::{
        parser::{self, Token},
        variables::{VariableRegistry, bind_arguments},
    },
    system::shell::Platform,
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Parses a command template and checks its variables without resolving them."
)]
struct ParseArgs {
    /// The template text. Ignored when --command is given.
    template: Option<String>,

    /// Check the template of a configured command instead.
    #[arg(long, short)]
    command: Option<String>,
}

/// A problem found in one invocation of a template.
#[derive(Debug, PartialEq, Eq)]
struct Finding {
    invocation: String,
    problem: String,
}

pub async fn handle(args: Vec<String>, session: &Session) -> Result<()> {
    // 1. Pick the template.
    let parse_args = ParseArgs::try_parse_from(&args)?;
    let template = match (&parse_args.command, &parse_args.template) {
        (Some(key), _) => {
            let Some(entry) = session.config.find_command(key) else {
                bail!("No shell command with id or alias '{}'.", key);
            };
            match entry.platform_commands.for_platform(Platform::current()) {
                Some(text) => text.to_string(),
                None => bail!("Shell command '{}' has no command text for this platform.", key),
            }
        }
        (None, Some(text)) => text.clone(),
        (None, None) => bail!("Give a template or --command <id>."),
    };

    // 2. Parse. Syntax errors are reported with their position.
    let tokens = parser::parse(&template)?;
    let registry = VariableRegistry::from_config(&session.config)?;

    // 3. Print the token stream.
    let names = parser::referenced_variables(&tokens);
    if !names.is_empty() {
        println!("\n  {:<10} {}", "uses".blue(), names.join(", "));
    }
    println!("\n--- {} ---", "Tokens".bold());
    for token in &tokens {
        match token {
            Token::Literal(text) => println!("  {:<10} {:?}", "literal".dimmed(), text),
            Token::Invocation(inv) => {
                let marker = if inv.unescaped { " (unescaped)" } else { "" };
                println!(
                    "  {:<10} {} {:?}{}",
                    "variable".blue(),
                    inv.name.cyan(),
                    inv.arguments,
                    marker.yellow()
                );
            }
        }
    }

    // 4. Report problems.
    let findings = check_tokens(&tokens, &registry);
    if findings.is_empty() {
        println!("\n{}", "Template is valid.".green());
        return Ok(());
    }
    println!();
    for finding in &findings {
        println!("  {} {}: {}", "✗".red(), finding.invocation.yellow(), finding.problem);
    }
    bail!("Template has {} problem(s).", findings.len())
}

/// Checks the template against the registry: every referenced variable must
/// exist (reported once per name), and each invocation's arguments must fit
/// the variable's parameters.
fn check_tokens(tokens: &[Token], registry: &VariableRegistry) -> Vec<Finding> {
    let mut findings: Vec<Finding> = parser::referenced_variables(tokens)
        .into_iter()
        .filter(|name| registry.get(name).is_none())
        .map(|name| Finding {
            invocation: format!("{{{{{}}}}}", name),
            problem: format!("unknown variable '{}'", name),
        })
        .collect();

    for token in tokens {
        let Token::Invocation(inv) = token else {
            continue;
        };
        let Some(variable) = registry.get(&inv.name) else {
            continue;
        };
        if let Err(problem) = bind_arguments(variable.provider().parameters(), &inv.arguments) {
            findings.push(Finding {
                invocation: parser::reconstruct(std::slice::from_ref(token)),
                problem,
            });
        }
    }
    findings
}
