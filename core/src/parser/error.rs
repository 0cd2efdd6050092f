use core::fmt;
use core::ops::Range;

use thiserror::Error;

use super::Rule;

/// A byte range in schema source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span(pub Range<usize>);

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self(start..end)
    }

    pub fn str_of<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.0.clone()).unwrap_or("")
    }
}

impl From<pest::Span<'_>> for Span {
    fn from(s: pest::Span<'_>) -> Self {
        Self(s.start()..s.end())
    }
}

/// Parser error with its location
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", self.to_diagnostic())]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

/// Specific kinds of parse errors
#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    UnexpectedToken { expected: String, found: String },
    /// A table, enum, union or attribute declared twice in one file.
    DuplicateDefinition { name: String },
    InvalidNumber { text: String },
    /// Catch-all for pest errors we don't specifically handle
    Other { message: String },
}

/// A parse error prepared for display: message, code and help lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub span: Span,
    pub help: Vec<String>,
    /// Error code (e.g. "S001").
    pub code: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {}", self.message)?;
        if let Some(ref code) = self.code {
            write!(f, " [{}]", code)?;
        }
        for help_msg in &self.help {
            write!(f, "\nhelp: {}", help_msg)?;
        }
        Ok(())
    }
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let (message, code, help) = match &self.kind {
            ParseErrorKind::UnexpectedToken { expected, found } => (
                format!("Expected {}, found {}", expected, found),
                "S001",
                vec![],
            ),
            ParseErrorKind::DuplicateDefinition { name } => (
                format!("`{}` is defined more than once", name),
                "S002",
                vec!["Rename or remove one of the definitions".to_string()],
            ),
            ParseErrorKind::InvalidNumber { text } => (
                format!("Invalid number literal '{}'", text),
                "S003",
                vec!["Check the number format and its range".to_string()],
            ),
            ParseErrorKind::Other { message } => (message.clone(), "S999", vec![]),
        };

        Diagnostic {
            message,
            span: self.span.clone(),
            help,
            code: Some(code.to_string()),
        }
    }
}

/// Convert a pest error to a human-readable ParseError
pub fn convert_pest_error(err: pest::error::Error<Rule>) -> ParseError {
    use pest::error::{ErrorVariant, InputLocation};

    let span = match err.location {
        InputLocation::Pos(pos) => Span(pos..pos),
        InputLocation::Span((start, end)) => Span(start..end),
    };

    let kind = match err.variant {
        ErrorVariant::ParsingError {
            positives,
            negatives,
        } => ParseErrorKind::UnexpectedToken {
            expected: format_expected_rules(&positives),
            found: format_found_rules(&negatives),
        },
        ErrorVariant::CustomError { message } => ParseErrorKind::Other { message },
    };

    ParseError::new(kind, span)
}

fn describe(rule: Rule) -> &'static str {
    match rule {
        Rule::ident | Rule::qualified => "identifier",
        Rule::number => "number",
        Rule::string_lit => "quoted string",
        Rule::include => "include",
        Rule::keyword => "keyword",
        Rule::namespace_decl
        | Rule::attribute_decl
        | Rule::table_def
        | Rule::enum_def
        | Rule::union_def
        | Rule::root_decl => "definition",
        Rule::field => "field",
        Rule::field_type | Rule::vector_type => "type",
        Rule::default_value => "default value",
        Rule::attributes => "attribute list",
        Rule::enum_member | Rule::union_member => "member",
        Rule::EOI => "end of input",
        _ => "token",
    }
}

/// Format expected rules in a human-readable way
fn format_expected_rules(rules: &[Rule]) -> String {
    let mut concepts: Vec<&str> = Vec::new();
    for rule in rules {
        let concept = describe(*rule);
        if !concepts.contains(&concept) {
            concepts.push(concept);
        }
    }

    match concepts.split_last() {
        None => "something else".to_string(),
        Some((only, [])) => only.to_string(),
        Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
    }
}

fn format_found_rules(rules: &[Rule]) -> String {
    match rules.first() {
        Some(rule) => describe(*rule).to_string(),
        None => "unexpected token".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_to_diagnostic() {
        let error = ParseError::new(
            ParseErrorKind::UnexpectedToken {
                expected: "field".to_string(),
                found: "number".to_string(),
            },
            Span(10..20),
        );

        let diagnostic = error.to_diagnostic();
        assert!(diagnostic.message.contains("Expected field"));
        assert!(diagnostic.message.contains("found number"));
        assert_eq!(diagnostic.code, Some("S001".to_string()));
        assert_eq!(diagnostic.span, Span(10..20));
    }

    #[test]
    fn test_display_includes_code_and_help() {
        let error = ParseError::new(
            ParseErrorKind::DuplicateDefinition {
                name: "Monster".to_string(),
            },
            Span::new(0, 5),
        );
        let text = error.to_string();
        assert!(text.starts_with("error: `Monster` is defined more than once [S002]"));
        assert!(text.contains("\nhelp: "));
    }

    #[test]
    fn test_expected_rules_are_grouped() {
        assert_eq!(
            format_expected_rules(&[Rule::ident, Rule::qualified, Rule::number]),
            "identifier or number"
        );
        assert_eq!(format_expected_rules(&[]), "something else");
    }
}
