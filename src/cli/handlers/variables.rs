// src/cli/handlers/variables.rs

use anyhow::Result;
use clap::Parser;
use colored::*;

use super::commons::Session;
use crate::{
    core::variables::RegisteredVariable,
    models::DefaultValue,
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Lists the variables available to command templates."
)]
struct VariablesArgs {
    /// Only list variables whose name contains this text.
    filter: Option<String>,
}

pub async fn handle(args: Vec<String>, session: &Session) -> Result<()> {
    let variables_args = VariablesArgs::try_parse_from(&args)?;
    let runner = session.runner()?;
    let values = runner.custom_values();

    println!("\n--- {} ---", "Variables".bold());
    for (name, variable) in runner.registry().iter() {
        if let Some(filter) = &variables_args.filter
            && !name.contains(filter.as_str())
        {
            continue;
        }
        println!("  {}", usage_line(name, variable).cyan());
        let description = variable.provider().description();
        if !description.is_empty() {
            println!("      {}", description);
        }
        if let Some(policy) = variable.default_value() {
            println!("      {:<10} {}", "default:".blue(), describe_policy(policy));
        }
        if let Some(value) = values.get(name) {
            println!("      {:<10} {}", "value:".blue(), value.green());
        }
    }
    Ok(())
}

/// `{{name:<arg>:[opt]}}`
fn usage_line(name: &str, variable: &RegisteredVariable) -> String {
    let mut line = format!("{{{{{}", name);
    for spec in variable.provider().parameters() {
        line.push(':');
        line.push_str(&spec.usage());
    }
    line.push_str("}}");
    line
}

fn describe_policy(policy: &DefaultValue) -> String {
    match policy {
        DefaultValue::ShowErrors => "show errors".to_string(),
        DefaultValue::CancelSilently => "cancel silently".to_string(),
        DefaultValue::Value(value) => format!("use \"{}\"", value),
    }
}
