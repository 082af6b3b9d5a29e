//! # Variables
//!
//! A variable is anything that can produce a value for a `{{name:args}}`
//! invocation. Every provider implements the flat [`Variable`] trait; shared
//! behaviour (argument binding against a [`ParameterSpec`] schema) lives in
//! free functions here rather than in a type hierarchy.
//!
//! The [`VariableRegistry`] maps names to providers and remembers each
//! variable's global default-value policy.

pub mod builtin;
pub mod custom;
pub mod event;

use crate::{
    core::events::EventData,
    host::Host,
    models::{DefaultValue, ShellCommandsConfig},
    system::shell::Shell,
};
use async_trait::async_trait;
use std::{collections::BTreeMap, fmt, sync::Arc};
use thiserror::Error;

pub use custom::CustomVariableValues;

/// A provider could not produce a value. The message is shown to the user
/// unless a default-value policy takes over.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct VariableError(pub String);

impl VariableError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("A variable named '{0}' is already registered.")]
    Duplicate(String),
    #[error("Cannot set a default value for unknown variable '{0}'.")]
    Unknown(String),
}

/// The type an argument must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    Text,
    /// A non-negative integer.
    Integer,
    /// One of a fixed set of keywords.
    OneOf(&'static [&'static str]),
}

/// One positional parameter of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub kind: ParameterKind,
    pub required: bool,
    /// Used when the argument is omitted. Makes a required parameter optional in practice.
    pub implicit_default: Option<&'static str>,
}

impl ParameterSpec {
    pub const fn required(name: &'static str, kind: ParameterKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            implicit_default: None,
        }
    }

    pub const fn optional(name: &'static str, kind: ParameterKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            implicit_default: None,
        }
    }

    pub const fn with_default(name: &'static str, kind: ParameterKind, default: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            implicit_default: Some(default),
        }
    }

    /// Renders the parameter for help output, e.g. `<format>` or `[line|column]`.
    pub fn usage(&self) -> String {
        let inner = match self.kind {
            ParameterKind::OneOf(values) => values.join("|"),
            ParameterKind::Text | ParameterKind::Integer => self.name.to_string(),
        };
        if self.required && self.implicit_default.is_none() {
            format!("<{}>", inner)
        } else {
            format!("[{}]", inner)
        }
    }
}

/// Arguments after validation against a schema, addressable by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundArguments {
    values: Vec<(&'static str, Option<String>)>,
}

impl BoundArguments {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    /// An integer argument. Binding already guaranteed it parses.
    pub fn get_integer(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(|v| v.parse().ok())
    }
}

/// Binds raw arguments positionally to `specs`.
///
/// Fails on excess arguments, on missing required arguments without an
/// implicit default, and on arguments of the wrong type.
pub fn bind_arguments(specs: &[ParameterSpec], raw: &[String]) -> Result<BoundArguments, String> {
    if raw.len() > specs.len() {
        return Err(format!(
            "Expected at most {} argument(s), got {}.",
            specs.len(),
            raw.len()
        ));
    }

    let mut values = Vec::with_capacity(specs.len());
    for (position, spec) in specs.iter().enumerate() {
        let value = match raw.get(position) {
            Some(arg) => Some(arg.clone()),
            None => match spec.implicit_default {
                Some(default) => Some(default.to_string()),
                None if spec.required => {
                    return Err(format!("Argument '{}' is required.", spec.name));
                }
                None => None,
            },
        };
        if let Some(v) = &value {
            check_kind(spec, v)?;
        }
        values.push((spec.name, value));
    }
    Ok(BoundArguments { values })
}

fn check_kind(spec: &ParameterSpec, value: &str) -> Result<(), String> {
    match spec.kind {
        ParameterKind::Text => Ok(()),
        ParameterKind::Integer => value.parse::<u64>().map(|_| ()).map_err(|_| {
            format!(
                "Argument '{}' must be a non-negative integer, got '{}'.",
                spec.name, value
            )
        }),
        ParameterKind::OneOf(allowed) => {
            if allowed.contains(&value) {
                Ok(())
            } else {
                Err(format!(
                    "Argument '{}' must be one of {}, got '{}'.",
                    spec.name,
                    allowed.join(", "),
                    value
                ))
            }
        }
    }
}

/// Everything a provider may look at while producing a value.
#[derive(Clone, Copy)]
pub struct VariableContext<'a> {
    pub host: &'a dyn Host,
    pub shell: &'a Shell,
    pub event: Option<&'a EventData>,
    /// Output handed over from another shell command (`{{output}}`).
    pub output: Option<&'a str>,
    pub custom_values: &'a CustomVariableValues,
}

impl fmt::Debug for VariableContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableContext")
            .field("shell", &self.shell.name)
            .field("event", &self.event)
            .field("output", &self.output.map(str::len))
            .finish_non_exhaustive()
    }
}

/// A variable provider.
#[async_trait]
pub trait Variable: Send + Sync + fmt::Debug {
    /// The name used in templates.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn parameters(&self) -> &[ParameterSpec] {
        &[]
    }

    /// When false, [`Variable::is_available`] is consulted before generating a value.
    fn always_available(&self) -> bool {
        true
    }

    async fn is_available(&self, _ctx: &VariableContext<'_>) -> bool {
        true
    }

    /// Why the variable is unavailable right now.
    fn unavailable_message(&self, _ctx: &VariableContext<'_>) -> String {
        format!("{{{{{}}}}} is not available right now.", self.name())
    }

    async fn generate_value(
        &self,
        args: &BoundArguments,
        ctx: &VariableContext<'_>,
    ) -> Result<String, VariableError>;
}

/// A provider plus its global default-value policy.
#[derive(Debug, Clone)]
pub struct RegisteredVariable {
    provider: Arc<dyn Variable>,
    default_value: Option<DefaultValue>,
}

impl RegisteredVariable {
    pub fn provider(&self) -> &dyn Variable {
        self.provider.as_ref()
    }

    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default_value.as_ref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    variables: BTreeMap<String, RegisteredVariable>,
}

impl VariableRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in and event variable.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for provider in builtin::all().into_iter().chain(event::all()) {
            let name = provider.name().to_string();
            registry.variables.insert(
                name,
                RegisteredVariable {
                    provider,
                    default_value: None,
                },
            );
        }
        registry
    }

    /// Built-ins, the configuration's custom variables and the global default values.
    pub fn from_config(config: &ShellCommandsConfig) -> Result<Self, RegistryError> {
        let mut registry = Self::with_builtins();
        for (name, custom) in &config.custom_variables {
            registry.register(Arc::new(custom::CustomVariable::new(
                name,
                custom.description.clone(),
            )))?;
        }
        for (name, settings) in &config.variables {
            if let Some(default_value) = &settings.default_value {
                registry.set_default_value(name, default_value.clone())?;
            }
        }
        Ok(registry)
    }

    pub fn register(&mut self, provider: Arc<dyn Variable>) -> Result<(), RegistryError> {
        let name = provider.name().to_string();
        if self.variables.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        log::trace!("Registering variable '{}'", name);
        self.variables.insert(
            name,
            RegisteredVariable {
                provider,
                default_value: None,
            },
        );
        Ok(())
    }

    pub fn set_default_value(&mut self, name: &str, value: DefaultValue) -> Result<(), RegistryError> {
        let entry = self
            .variables
            .get_mut(name)
            .ok_or_else(|| RegistryError::Unknown(name.to_string()))?;
        entry.default_value = Some(value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredVariable> {
        self.variables.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegisteredVariable)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CustomVariableConfig, VariableSettings};

    const MODE: &[&str] = &["relative", "absolute"];

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_bind_arguments_positional() {
        let specs = [
            ParameterSpec::required("mode", ParameterKind::OneOf(MODE)),
            ParameterSpec::optional("count", ParameterKind::Integer),
        ];
        let bound = bind_arguments(&specs, &args(&["absolute", "3"])).unwrap();
        assert_eq!(bound.get("mode"), Some("absolute"));
        assert_eq!(bound.get_integer("count"), Some(3));

        let bound = bind_arguments(&specs, &args(&["relative"])).unwrap();
        assert_eq!(bound.get("count"), None);
    }

    #[test]
    fn test_bind_arguments_errors() {
        let specs = [ParameterSpec::required("mode", ParameterKind::OneOf(MODE))];
        assert!(bind_arguments(&specs, &args(&[])).unwrap_err().contains("required"));
        assert!(bind_arguments(&specs, &args(&["sideways"])).unwrap_err().contains("one of"));
        assert!(bind_arguments(&specs, &args(&["relative", "extra"])).unwrap_err().contains("at most"));

        let count = [ParameterSpec::optional("count", ParameterKind::Integer)];
        assert!(bind_arguments(&count, &args(&["-1"])).is_err());
        assert!(bind_arguments(&[], &args(&["x"])).is_err());
    }

    #[test]
    fn test_implicit_default_fills_missing_argument() {
        let specs = [ParameterSpec::with_default(
            "dot",
            ParameterKind::OneOf(&["with-dot", "no-dot"]),
            "no-dot",
        )];
        let bound = bind_arguments(&specs, &[]).unwrap();
        assert_eq!(bound.get("dot"), Some("no-dot"));
        assert_eq!(specs[0].usage(), "[with-dot|no-dot]");
    }

    #[test]
    fn test_registry_from_config() {
        let mut config = ShellCommandsConfig::default();
        config
            .custom_variables
            .insert("_project".to_string(), CustomVariableConfig::default());
        config.variables.insert(
            "_project".to_string(),
            VariableSettings {
                default_value: Some(DefaultValue::Value("none".to_string())),
            },
        );
        let registry = VariableRegistry::from_config(&config).unwrap();
        assert!(registry.get("file_name").is_some());
        assert!(registry.get("event_file_name").is_some());
        let custom = registry.get("_project").unwrap();
        assert_eq!(custom.default_value(), Some(&DefaultValue::Value("none".to_string())));
    }

    #[test]
    fn test_registry_rejects_duplicates_and_unknown_defaults() {
        let mut registry = VariableRegistry::with_builtins();
        let duplicate = Arc::new(custom::CustomVariable::new("_x", None));
        registry.register(duplicate.clone()).unwrap();
        assert_eq!(
            registry.register(duplicate),
            Err(RegistryError::Duplicate("_x".to_string()))
        );
        assert_eq!(
            registry.set_default_value("nope", DefaultValue::ShowErrors),
            Err(RegistryError::Unknown("nope".to_string()))
        );
    }
}
