//! Error rendering using ariadne
//!
//! Schema parse errors are shown with a snippet of the offending file, its
//! error code and help lines. Other errors are printed as a single line.

use crate::Error;
use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use flatrecord_core::parser::ParseError;
use std::io::Write;

/// Render an error to stderr
///
/// # Example
/// ```no_run
/// use flatrecord::{load_schema, render_error};
///
/// if let Err(e) = load_schema("schema/monster.fbs") {
///     render_error(&e);
/// }
/// ```
pub fn render_error(error: &Error) {
    render_error_to_writer(error, &mut std::io::stderr(), true).ok();
}

/// Render an error to a specific writer
pub fn render_error_to(error: &Error, writer: &mut dyn Write) -> std::io::Result<()> {
    render_error_to_writer(error, writer, true)
}

/// Render an error to a String
pub fn render_error_to_string(error: &Error) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, &mut buf, true).ok();
    String::from_utf8_lossy(&buf).to_string()
}

/// Render an error to a String without color codes (useful for tests)
pub fn render_error_to_string_no_color(error: &Error) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).to_string()
}

fn render_error_to_writer(
    error: &Error,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    match error {
        Error::Parse { path, text, error } => {
            let name = path.display().to_string();
            render_parse_error(&name, text, error, writer, use_color)
        }
        Error::Io { .. } => writeln!(writer, "I/O error: {}", error),
        Error::Codec(e) if e.is_schema_error() => writeln!(writer, "Schema error: {}", e),
        Error::Codec(e) => writeln!(writer, "Codec error: {}", e),
    }
}

fn render_parse_error(
    name: &str,
    source: &str,
    error: &ParseError,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    let diag = error.to_diagnostic();
    let mut colors = ColorGenerator::new();
    colors.next(); // Skip the first color.

    let mut report = Report::build(ReportKind::Error, (name, diag.span.0.clone()))
        .with_message(&diag.message)
        .with_config(ariadne::Config::default().with_color(use_color));

    if let Some(code) = &diag.code {
        report = report.with_code(code);
    }

    report = report.with_label(
        Label::new((name, diag.span.0.clone()))
            .with_message(&diag.message)
            .with_color(colors.next()),
    );

    for help_msg in &diag.help {
        report = report.with_help(help_msg);
    }

    report.finish().write((name, Source::from(source)), &mut *writer)
}
