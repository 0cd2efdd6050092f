//! Errors raised while analyzing schemas and encoding or decoding buffers.

use thiserror::Error;

use crate::parser::ParseError;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A field's declared type has no wire mapping.
    #[error("cannot handle field `{table}.{field}` of type `{ty}`: {reason}")]
    UnsupportedType {
        table: String,
        field: String,
        ty: String,
        reason: String,
    },

    /// A definition disagrees with the schema it is checked against.
    #[error("schema mismatch in `{context}`: {reason}")]
    SchemaMismatch { context: String, reason: String },

    #[error("unknown table `{name}`")]
    UnknownTable { name: String },

    #[error("invalid default for `{table}.{field}`: {reason}")]
    InvalidDefault {
        table: String,
        field: String,
        reason: String,
    },

    #[error("missing value for required field `{table}.{field}`")]
    MissingField { table: String, field: String },

    /// A value does not fit the layout of the field it is stored in.
    #[error("value of `{table}.{field}` does not match its layout: expected {expected}")]
    ValueMismatch {
        table: String,
        field: String,
        expected: String,
    },

    #[error("malformed buffer: {reason}")]
    MalformedBuffer { reason: String },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedBuffer {
            reason: reason.into(),
        }
    }

    pub(crate) fn mismatch(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::SchemaMismatch {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// True for errors raised while building a layout, as opposed to
    /// errors raised by a particular value or buffer.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedType { .. }
                | Error::SchemaMismatch { .. }
                | Error::UnknownTable { .. }
                | Error::InvalidDefault { .. }
                | Error::Parse(_)
        )
    }
}
