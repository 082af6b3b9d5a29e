//! # Variable Resolver
//!
//! Turns parsed tokens into [`ResolvedSegment`]s. Invocations are resolved one
//! after another in template order, so a provider with side effects always sees
//! the effects of every invocation to its left.
//!
//! When a variable cannot produce a value, the default-value policy decides
//! what happens. The policy is looked up in two steps, see
//! [`effective_default_value`].

use crate::{
    core::{
        parser::{Invocation, Token},
        variables::{VariableContext, VariableRegistry, bind_arguments},
    },
    models::{CommandDefaultValue, DefaultValue},
};
use std::collections::BTreeMap;
use thiserror::Error;

/// One piece of the final command: literal template text or a variable's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSegment {
    pub text: String,
    /// Copied into the command without escaping.
    pub unescaped: bool,
}

impl ResolvedSegment {
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            unescaped: true,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Unknown variable {{{{{name}}}}}.")]
    UnknownVariable { name: String },
    #[error("Invalid arguments for {{{{{name}}}}}: {message}")]
    InvalidArguments { name: String, message: String },
    #[error("{message}")]
    VariableUnavailable {
        name: String,
        message: String,
        /// The user asked not to be told about it.
        silent: bool,
    },
}

impl ResolutionError {
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::VariableUnavailable { silent: true, .. })
    }
}

/// Picks the policy for one variable: the command's own setting unless it is
/// absent or `Inherit`, then the variable's global setting, then `ShowErrors`.
pub fn effective_default_value(
    command_scope: Option<&CommandDefaultValue>,
    global_scope: Option<&DefaultValue>,
) -> DefaultValue {
    command_scope
        .and_then(CommandDefaultValue::as_policy)
        .or_else(|| global_scope.cloned())
        .unwrap_or_default()
}

/// Resolves every token. The first failing invocation aborts the whole resolution.
///
/// `defaults` holds the running command's per-variable default-value settings.
pub async fn resolve(
    tokens: &[Token],
    registry: &VariableRegistry,
    ctx: &VariableContext<'_>,
    defaults: &BTreeMap<String, CommandDefaultValue>,
) -> Result<Vec<ResolvedSegment>, ResolutionError> {
    let mut segments = Vec::with_capacity(tokens.len());
    for token in tokens {
        let segment = match token {
            Token::Literal(text) => ResolvedSegment::literal(text.as_str()),
            Token::Invocation(invocation) => ResolvedSegment {
                text: resolve_invocation(invocation, registry, ctx, defaults).await?,
                unescaped: invocation.unescaped,
            },
        };
        segments.push(segment);
    }
    Ok(segments)
}

async fn resolve_invocation(
    invocation: &Invocation,
    registry: &VariableRegistry,
    ctx: &VariableContext<'_>,
    defaults: &BTreeMap<String, CommandDefaultValue>,
) -> Result<String, ResolutionError> {
    let name = invocation.name.as_str();

    // 1. Lookup
    let registered = registry
        .get(name)
        .ok_or_else(|| ResolutionError::UnknownVariable {
            name: name.to_string(),
        })?;
    let provider = registered.provider();

    // 2. Argument binding
    let args = bind_arguments(provider.parameters(), &invocation.arguments).map_err(|message| {
        ResolutionError::InvalidArguments {
            name: name.to_string(),
            message,
        }
    })?;

    // 3. Availability, then generation
    let failure = if !provider.always_available() && !provider.is_available(ctx).await {
        provider.unavailable_message(ctx)
    } else {
        match provider.generate_value(&args, ctx).await {
            Ok(value) => {
                log::trace!("{{{{{}}}}} resolved to {:?}", name, value);
                return Ok(value);
            }
            Err(e) => e.0,
        }
    };

    // 4. Default-value policy
    let policy = effective_default_value(defaults.get(name), registered.default_value());
    log::debug!("{{{{{}}}}} has no value ({}); applying {:?}", name, failure, policy);
    match policy {
        DefaultValue::Value(value) => Ok(value),
        DefaultValue::ShowErrors => Err(ResolutionError::VariableUnavailable {
            name: name.to_string(),
            message: failure,
            silent: false,
        }),
        DefaultValue::CancelSilently => Err(ResolutionError::VariableUnavailable {
            name: name.to_string(),
            message: failure,
            silent: true,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{
            escaper::compose,
            parser::parse,
            variables::{
                BoundArguments, CustomVariableValues, ParameterKind, ParameterSpec, Variable,
                VariableError,
            },
        },
        host::memory::MemoryHost,
        system::shell::{Shell, ShellDialect},
    };
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::{
        path::PathBuf,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    /// Returns 1, 2, 3... on successive generations.
    #[derive(Debug, Default)]
    struct Counter(AtomicUsize);

    #[async_trait]
    impl Variable for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        async fn generate_value(
            &self,
            _args: &BoundArguments,
            _ctx: &VariableContext<'_>,
        ) -> Result<String, VariableError> {
            Ok((self.0.fetch_add(1, Ordering::SeqCst) + 1).to_string())
        }
    }

    /// A variable that is never available.
    #[derive(Debug)]
    struct Missing;

    #[async_trait]
    impl Variable for Missing {
        fn name(&self) -> &str {
            "missing"
        }

        fn parameters(&self) -> &[ParameterSpec] {
            const SPECS: [ParameterSpec; 1] = [ParameterSpec::optional("n", ParameterKind::Integer)];
            &SPECS
        }

        fn always_available(&self) -> bool {
            false
        }

        async fn is_available(&self, _ctx: &VariableContext<'_>) -> bool {
            false
        }

        async fn generate_value(
            &self,
            _args: &BoundArguments,
            _ctx: &VariableContext<'_>,
        ) -> Result<String, VariableError> {
            Ok("should never be used".to_string())
        }
    }

    fn registry() -> VariableRegistry {
        let mut registry = VariableRegistry::with_builtins();
        registry.register(Arc::new(Counter::default())).unwrap();
        registry.register(Arc::new(Missing)).unwrap();
        registry
    }

    fn shell() -> Shell {
        Shell {
            name: "sh".to_string(),
            path: PathBuf::from("sh"),
            args: vec!["-c".to_string()],
            dialect: ShellDialect::DoubleQuote,
        }
    }

    async fn run(
        template: &str,
        registry: &VariableRegistry,
        defaults: &BTreeMap<String, CommandDefaultValue>,
    ) -> Result<Vec<ResolvedSegment>, ResolutionError> {
        let host = MemoryHost::new("/vault").with_active_file("My File.md", "");
        let shell = shell();
        let custom = CustomVariableValues::new();
        let ctx = VariableContext {
            host: &host,
            shell: &shell,
            event: None,
            output: None,
            custom_values: &custom,
        };
        let tokens = parse(template).unwrap();
        resolve(&tokens, registry, &ctx, defaults).await
    }

    #[test]
    fn test_effective_default_value_cascade() {
        let global = DefaultValue::Value("g".to_string());
        assert_eq!(
            effective_default_value(Some(&CommandDefaultValue::Inherit), Some(&global)),
            global
        );
        assert_eq!(effective_default_value(None, Some(&global)), global);
        assert_eq!(
            effective_default_value(Some(&CommandDefaultValue::CancelSilently), Some(&global)),
            DefaultValue::CancelSilently
        );
        assert_eq!(
            effective_default_value(Some(&CommandDefaultValue::Inherit), None),
            DefaultValue::ShowErrors
        );
        assert_eq!(effective_default_value(None, None), DefaultValue::ShowErrors);
    }

    #[tokio::test]
    async fn test_scenario_segments() {
        let mut registry = registry();
        registry
            .set_default_value("output", DefaultValue::Value(">> log.txt".to_string()))
            .unwrap();
        let segments = run("echo {{file_name}} {{!output}}", &registry, &BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(
            segments,
            vec![
                ResolvedSegment::literal("echo "),
                ResolvedSegment {
                    text: "My File.md".to_string(),
                    unescaped: false
                },
                ResolvedSegment::literal(" "),
                ResolvedSegment {
                    text: ">> log.txt".to_string(),
                    unescaped: true
                },
            ]
        );
        assert_eq!(
            compose(&segments, ShellDialect::DoubleQuote),
            r#"echo "My File.md" >> log.txt"#
        );
    }

    #[tokio::test]
    async fn test_counter_occurrences_resolve_in_order() {
        let segments = run("{{counter}}-{{counter}}-{{counter}}", &registry(), &BTreeMap::new())
            .await
            .unwrap();
        let texts: Vec<_> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["1", "-", "2", "-", "3"]);
    }

    #[tokio::test]
    async fn test_unavailable_without_default_is_an_error() {
        let error = run("echo {{missing}}", &registry(), &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(
            &error,
            ResolutionError::VariableUnavailable { name, silent: false, .. } if name == "missing"
        ));
        assert!(!error.is_silent());
    }

    #[tokio::test]
    async fn test_cancel_silently_is_flagged() {
        let mut defaults = BTreeMap::new();
        defaults.insert("missing".to_string(), CommandDefaultValue::CancelSilently);
        let error = run("{{missing}}", &registry(), &defaults).await.unwrap_err();
        assert!(error.is_silent());
    }

    #[tokio::test]
    async fn test_use_value_is_escaped_unless_unescaped() {
        let mut defaults = BTreeMap::new();
        defaults.insert("missing".to_string(), CommandDefaultValue::Value(r#"a"b"#.to_string()));
        let segments = run("echo {{missing}} {{!missing}}", &registry(), &defaults)
            .await
            .unwrap();
        assert_eq!(
            compose(&segments, ShellDialect::DoubleQuote),
            r#"echo "a\"b" a"b"#
        );
    }

    #[tokio::test]
    async fn test_command_inherit_falls_back_to_global() {
        let mut registry = registry();
        registry
            .set_default_value("missing", DefaultValue::Value("global".to_string()))
            .unwrap();
        let mut defaults = BTreeMap::new();
        defaults.insert("missing".to_string(), CommandDefaultValue::Inherit);
        let segments = run("{{missing}}", &registry, &defaults).await.unwrap();
        assert_eq!(segments[0].text, "global");
    }

    #[tokio::test]
    async fn test_unknown_variable_and_bad_arguments() {
        let error = run("{{nope}}", &registry(), &BTreeMap::new()).await.unwrap_err();
        assert_eq!(
            error,
            ResolutionError::UnknownVariable {
                name: "nope".to_string()
            }
        );

        let error = run("{{missing:x}}", &registry(), &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(error, ResolutionError::InvalidArguments { name, .. } if name == "missing"));
    }

    #[tokio::test]
    async fn test_failed_generation_applies_default_policy() {
        let mut defaults = BTreeMap::new();
        defaults.insert("clipboard".to_string(), CommandDefaultValue::Value("empty".to_string()));
        let segments = run("{{clipboard}}", &registry(), &defaults).await.unwrap();
        assert_eq!(segments[0].text, "empty");
    }
}
