// src/core/variables/custom.rs

use super::{BoundArguments, Variable, VariableContext, VariableError};
use crate::models::ShellCommandsConfig;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use thiserror::Error;

lazy_static! {
    static ref ASSIGNMENT_RE: Regex = Regex::new(r"(?s)^(_[A-Za-z0-9_]+)=(.*)$").unwrap();
}

/// Current values of the custom variables, keyed by name. A missing key means unset.
pub type CustomVariableValues = BTreeMap<String, String>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AssignmentError {
    #[error("Invalid assignment '{0}'. Expected '_name=value'.")]
    Malformed(String),
    #[error("Custom variable '{0}' is not defined in the configuration.")]
    Undefined(String),
}

/// A user-defined `{{_name}}` variable. Its value comes from the invocation's
/// [`CustomVariableValues`]; while unset it is unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomVariable {
    name: String,
    description: String,
}

impl CustomVariable {
    pub fn new(name: &str, description: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            description: description.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl Variable for CustomVariable {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn always_available(&self) -> bool {
        false
    }

    async fn is_available(&self, ctx: &VariableContext<'_>) -> bool {
        ctx.custom_values.contains_key(&self.name)
    }

    fn unavailable_message(&self, _ctx: &VariableContext<'_>) -> String {
        format!("Custom variable {{{{{}}}}} has no value yet.", self.name)
    }

    async fn generate_value(
        &self,
        _args: &BoundArguments,
        ctx: &VariableContext<'_>,
    ) -> Result<String, VariableError> {
        ctx.custom_values
            .get(&self.name)
            .cloned()
            .ok_or_else(|| VariableError::new(self.unavailable_message(ctx)))
    }
}

/// The values custom variables start with, taken from `initial_value` in the configuration.
pub fn initial_values(config: &ShellCommandsConfig) -> CustomVariableValues {
    config
        .custom_variables
        .iter()
        .filter_map(|(name, c)| c.initial_value.clone().map(|v| (name.clone(), v)))
        .collect()
}

/// Applies `_name=value` assignments (from `--set`) on top of `values`.
pub fn apply_assignments(
    config: &ShellCommandsConfig,
    values: &mut CustomVariableValues,
    assignments: &[String],
) -> Result<(), AssignmentError> {
    for assignment in assignments {
        let captures = ASSIGNMENT_RE
            .captures(assignment)
            .ok_or_else(|| AssignmentError::Malformed(assignment.clone()))?;
        let (Some(name), Some(value)) = (captures.get(1), captures.get(2)) else {
            return Err(AssignmentError::Malformed(assignment.clone()));
        };
        let name = name.as_str();
        if !config.custom_variables.contains_key(name) {
            return Err(AssignmentError::Undefined(name.to_string()));
        }
        log::debug!("Setting custom variable '{}'", name);
        values.insert(name.to_string(), value.as_str().to_string());
    }
    Ok(())
}
