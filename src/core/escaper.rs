// src/core/escaper.rs

use crate::{core::resolver::ResolvedSegment, system::shell::ShellDialect};

/// Quotes `value` so that the target shell sees it as one literal word.
pub fn escape(value: &str, dialect: ShellDialect) -> String {
    match dialect {
        ShellDialect::DoubleQuote => wrap_double_quoted(value),
        ShellDialect::SingleQuote => wrap_single_quoted(value),
        ShellDialect::CmdDoubleQuote => format!("\"{}\"", value.replace('"', "\"\"")),
    }
}

/// Joins resolved segments into the final command string.
///
/// Segments marked unescaped (literal template text and `{{!name}}` values) are
/// copied as they are; every other value is quoted for `dialect`.
pub fn compose(segments: &[ResolvedSegment], dialect: ShellDialect) -> String {
    let mut command = String::with_capacity(segments.iter().map(|s| s.text.len() + 2).sum());
    for segment in segments {
        if segment.unescaped {
            command.push_str(&segment.text);
        } else {
            command.push_str(&escape(&segment.text, dialect));
        }
    }
    command
}

// Inside POSIX double quotes only these four keep a special meaning.
fn wrap_double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// PowerShell closes a single-quoted string on the ASCII quote and on the
/// typographic single quotes, so every one of them is doubled.
const SINGLE_QUOTES: [char; 5] = ['\'', '\u{2018}', '\u{2019}', '\u{201A}', '\u{201B}'];

fn wrap_single_quoted(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if SINGLE_QUOTES.contains(&c) {
            quoted.push(c);
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn escaped(text: &str) -> ResolvedSegment {
        ResolvedSegment {
            text: text.to_string(),
            unescaped: false,
        }
    }

    fn raw(text: &str) -> ResolvedSegment {
        ResolvedSegment {
            text: text.to_string(),
            unescaped: true,
        }
    }

    #[test]
    fn test_compose_scenario_with_raw_suffix() {
        let segments = vec![
            raw("echo "),
            escaped("My File.md"),
            raw(" "),
            raw(">> log.txt"),
        ];
        assert_eq!(
            compose(&segments, ShellDialect::DoubleQuote),
            r#"echo "My File.md" >> log.txt"#
        );
    }

    #[test]
    fn test_double_quote_dialect_escapes_special_characters() {
        assert_eq!(escape(r#"a"b"#, ShellDialect::DoubleQuote), r#""a\"b""#);
        assert_eq!(
            escape(r"$HOME `id` \n", ShellDialect::DoubleQuote),
            r#""\$HOME \`id\` \\n""#
        );
        assert_eq!(escape("", ShellDialect::DoubleQuote), r#""""#);
    }

    #[test]
    fn test_single_quote_dialect_doubles_quotes() {
        assert_eq!(escape("it's $x", ShellDialect::SingleQuote), "'it''s $x'");
    }

    #[test]
    fn test_single_quote_dialect_doubles_typographic_quotes() {
        assert_eq!(
            escape("Don\u{2019}t; Remove-Item x; \u{2019}", ShellDialect::SingleQuote),
            "'Don\u{2019}\u{2019}t; Remove-Item x; \u{2019}\u{2019}'"
        );
        assert_eq!(
            escape("\u{2018}a\u{201A}b\u{201B}", ShellDialect::SingleQuote),
            "'\u{2018}\u{2018}a\u{201A}\u{201A}b\u{201B}\u{201B}'"
        );
        // Double-quote lookalikes are not string delimiters here.
        assert_eq!(escape("\u{201C}x\u{201D}", ShellDialect::SingleQuote), "'\u{201C}x\u{201D}'");
    }

    #[test]
    fn test_cmd_dialect_doubles_double_quotes() {
        assert_eq!(
            escape(r#"say "hi" & bye"#, ShellDialect::CmdDoubleQuote),
            r#""say ""hi"" & bye""#
        );
    }

    #[test]
    fn test_unescaped_value_is_never_modified() {
        let value = "rm -rf /";
        assert_eq!(compose(&[raw(value)], ShellDialect::DoubleQuote), value);
        assert_eq!(compose(&[raw(value)], ShellDialect::SingleQuote), value);
        assert_eq!(
            compose(&[escaped(value)], ShellDialect::DoubleQuote),
            "\"rm -rf /\""
        );
        assert_eq!(
            compose(&[escaped(value)], ShellDialect::SingleQuote),
            "'rm -rf /'"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_double_quoted_value_reaches_shell_as_one_literal_argument() {
        let nasty = r#"a "b" $HOME `whoami` \ c; rm -rf / *"#;
        let command = format!("printf '%s' {}", escape(nasty, ShellDialect::DoubleQuote));
        let output = std::process::Command::new("sh")
            .arg("-c")
            .arg(&command)
            .output()
            .unwrap();
        assert_eq!(String::from_utf8(output.stdout).unwrap(), nasty);
    }
}
