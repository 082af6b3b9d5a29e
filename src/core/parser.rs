//! # Template Parser
//!
//! Splits a command template into literal text and `{{variable:arg1:arg2}}`
//! invocations. The syntax:
//!
//! - `{{name}}`, `{{name:arg}}`, `{{name:arg1:arg2}}`
//! - `{{!name...}}` marks the value as unescaped (inserted raw into the command).
//! - Arguments are taken verbatim; a literal `:` inside an argument cannot be expressed.
//! - Braces inside an invocation are an error (variables cannot be nested).
//! - Single braces outside an invocation are ordinary text. In a run of three or
//!   more `{`, the extra leading braces are text: `{{{x}}}` is `{`, `{{x}}`, `}`.

use std::ops::Range;
use thiserror::Error;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// A malformed template. `position` is a byte offset into the template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (at position {position})")]
pub struct ParseError {
    pub position: usize,
    pub message: String,
}

impl ParseError {
    fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// A `{{...}}` span requesting a variable's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub arguments: Vec<String>,
    pub unescaped: bool,
    /// Byte range of the whole `{{...}}` in the template.
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    Invocation(Invocation),
}

/// Parses a template into an ordered token sequence.
///
/// Adjacent literal text is merged, so two `Literal` tokens are never neighbours.
pub fn parse(template: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(offset) = template.get(cursor..).and_then(|rest| rest.find(OPEN)) {
        // In a run of more than two `{`, only the last two open the invocation.
        let run = template.as_bytes()[cursor + offset..]
            .iter()
            .take_while(|&&b| b == b'{')
            .count();
        let open = cursor + offset + run - OPEN.len();
        let body_start = open + OPEN.len();
        let body_end = find_invocation_end(template, open, body_start)?;

        if open > literal_start {
            push_literal(&mut tokens, template.get(literal_start..open).unwrap_or_default());
        }

        let body = template.get(body_start..body_end).unwrap_or_default();
        let span = open..body_end + CLOSE.len();
        tokens.push(Token::Invocation(parse_invocation_body(body, span)?));

        cursor = body_end + CLOSE.len();
        literal_start = cursor;
    }

    if literal_start < template.len() {
        push_literal(&mut tokens, template.get(literal_start..).unwrap_or_default());
    }

    log::trace!("Parsed template into {} token(s).", tokens.len());
    Ok(tokens)
}

/// Rebuilds template source text from tokens.
pub fn reconstruct(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Literal(text) => out.push_str(text),
            Token::Invocation(inv) => {
                out.push_str(OPEN);
                if inv.unescaped {
                    out.push('!');
                }
                out.push_str(&inv.name);
                for arg in &inv.arguments {
                    out.push(':');
                    out.push_str(arg);
                }
                out.push_str(CLOSE);
            }
        }
    }
    out
}

/// The names of all variables a template uses, in order of first appearance.
pub fn referenced_variables(tokens: &[Token]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for token in tokens {
        if let Token::Invocation(inv) = token
            && !names.contains(&inv.name.as_str())
        {
            names.push(&inv.name);
        }
    }
    names
}

/// Scans forward from `body_start` to the `}}` closing the invocation opened at `open`.
fn find_invocation_end(template: &str, open: usize, body_start: usize) -> Result<usize, ParseError> {
    let bytes = template.as_bytes();
    let mut index = body_start;
    loop {
        match bytes.get(index) {
            None => {
                return Err(ParseError::new(
                    open,
                    "Unterminated variable: '{{' has no matching '}}'",
                ));
            }
            Some(b'}') if bytes.get(index + 1) == Some(&b'}') => return Ok(index),
            Some(b'{') if bytes.get(index + 1) == Some(&b'{') => {
                return Err(ParseError::new(
                    open,
                    "Unterminated variable: another '{{' starts before this one is closed",
                ));
            }
            Some(b'{') | Some(b'}') => {
                return Err(ParseError::new(
                    index,
                    "Braces are not allowed inside a variable; variables cannot be nested",
                ));
            }
            Some(_) => index += 1,
        }
    }
}

fn parse_invocation_body(body: &str, span: Range<usize>) -> Result<Invocation, ParseError> {
    let (unescaped, body) = match body.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, body),
    };

    let mut parts = body.split(':');
    let name = parts.next().unwrap_or_default();
    if name.is_empty() {
        return Err(ParseError::new(span.start, "Variable name is missing"));
    }

    Ok(Invocation {
        name: name.to_string(),
        arguments: parts.map(str::to_string).collect(),
        unescaped,
        span,
    })
}

fn push_literal(tokens: &mut Vec<Token>, text: &str) {
    if let Some(Token::Literal(previous)) = tokens.last_mut() {
        previous.push_str(text);
    } else {
        tokens.push(Token::Literal(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn invocation(name: &str, args: &[&str], unescaped: bool, span: Range<usize>) -> Token {
        Token::Invocation(Invocation {
            name: name.to_string(),
            arguments: args.iter().map(|a| a.to_string()).collect(),
            unescaped,
            span,
        })
    }

    #[test]
    fn test_parse_mixed_template() {
        let tokens = parse("echo {{file_name}} {{!suffix}}").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Literal("echo ".to_string()),
                invocation("file_name", &[], false, 5..18),
                Token::Literal(" ".to_string()),
                invocation("suffix", &[], true, 19..30),
            ]
        );
    }

    #[test]
    fn test_parse_arguments_are_verbatim() {
        let tokens = parse("{{date:YYYY-MM-DD HH}}{{file_path:absolute}}").unwrap();
        assert_eq!(
            tokens,
            vec![
                invocation("date", &["YYYY-MM-DD HH"], false, 0..22),
                invocation("file_path", &["absolute"], false, 22..44),
            ]
        );
    }

    #[test]
    fn test_empty_arguments_are_kept() {
        let tokens = parse("{{passthrough:}}").unwrap();
        assert_eq!(tokens, vec![invocation("passthrough", &[""], false, 0..16)]);
    }

    #[test]
    fn test_single_braces_are_literal() {
        let tokens = parse("awk '{print $1}' } {").unwrap();
        assert_eq!(tokens, vec![Token::Literal("awk '{print $1}' } {".to_string())]);
    }

    #[test]
    fn test_extra_closing_brace_after_invocation_is_literal() {
        let tokens = parse("{{title}}}").unwrap();
        assert_eq!(
            tokens,
            vec![
                invocation("title", &[], false, 0..9),
                Token::Literal("}".to_string()),
            ]
        );
    }

    #[test]
    fn test_extra_opening_braces_are_literal() {
        let tokens = parse("{{{title}}}").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Literal("{".to_string()),
                invocation("title", &[], false, 1..10),
                Token::Literal("}".to_string()),
            ]
        );

        let tokens = parse("x {{{{!a:b}}").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Literal("x {{".to_string()),
                invocation("a", &["b"], true, 4..12),
            ]
        );
        assert_eq!(reconstruct(&tokens), "x {{{{!a:b}}");
    }

    #[test]
    fn test_unterminated_invocation_reports_position() {
        let error = parse("echo hi {{file_name").unwrap_err();
        assert_eq!(error.position, 8);
        assert!(error.message.contains("Unterminated"));

        let error = parse("a {{b c {{d}}").unwrap_err();
        assert_eq!(error.position, 2);
    }

    #[test]
    fn test_nested_braces_are_an_error() {
        let error = parse("{{date:{x}}}").unwrap_err();
        assert_eq!(error.position, 7);
        assert!(error.message.contains("nested"));
    }

    #[test]
    fn test_missing_name_is_an_error() {
        assert!(parse("{{}}").is_err());
        assert!(parse("x {{!}}").is_err());
        assert!(parse("{{:arg}}").is_err());
    }

    #[test]
    fn test_non_ascii_literals_survive() {
        let template = "echo «{{title}}» → ✓";
        let tokens = parse(template).unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(reconstruct(&tokens), template);
    }

    #[test]
    fn test_reconstruct_round_trips_balanced_templates() {
        for template in [
            "",
            "plain text",
            "{{a}}",
            "{{!a:b:c}}x{{d}}",
            "pre {{x:1}} mid {{!y}} post }",
            "{ {{z}} }",
        ] {
            let tokens = parse(template).unwrap();
            assert_eq!(reconstruct(&tokens), template);
        }
    }

    #[test]
    fn test_referenced_variables_are_unique_and_ordered() {
        let tokens = parse("{{b}} {{a}} {{b:x}}").unwrap();
        assert_eq!(referenced_variables(&tokens), vec!["b", "a"]);
    }
}
