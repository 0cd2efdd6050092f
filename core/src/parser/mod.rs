//! The `.fbs` schema front end.
//!
//! Parsing happens in two stages. [`parse_file`] reads one file into a
//! [`SchemaFile`] and lists its includes; [`lower`] resolves the names of a
//! set of files into one [`Schema`](crate::types::Schema). [`parse`] does
//! both for a schema without includes.

pub mod error;
#[allow(clippy::module_inception)]
pub mod parser;

pub use error::{Diagnostic, ParseError, ParseErrorKind, Span};
pub use parser::{
    BUILTIN_ATTRIBUTES, ParsedField, ParsedTable, ParsedType, Rule, SchemaFile, SchemaParser,
    lower, parse, parse_file,
};

#[cfg(test)]
mod parser_test;
