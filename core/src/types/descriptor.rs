//! Declared field types, as written in a schema or built by hand.

use core::fmt;

use super::ScalarKind;

/// The declared type of a table field.
///
/// Tables, enums and unions are referenced by name and resolved against a
/// [`Schema`](super::Schema), so recursive tables can be declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    Scalar(ScalarKind),
    String,
    Bytes,
    Table(String),
    Enum(String),
    Union(String),
    List(Box<TypeDesc>),
    Optional(Box<TypeDesc>),
}

impl TypeDesc {
    pub fn table(name: impl Into<String>) -> Self {
        TypeDesc::Table(name.into())
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        TypeDesc::Enum(name.into())
    }

    pub fn union(name: impl Into<String>) -> Self {
        TypeDesc::Union(name.into())
    }

    pub fn list(elem: TypeDesc) -> Self {
        TypeDesc::List(Box::new(elem))
    }

    pub fn optional(inner: TypeDesc) -> Self {
        TypeDesc::Optional(Box::new(inner))
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, TypeDesc::Optional(_))
    }

    /// Names of the tables, enums and unions this type mentions.
    pub(crate) fn referenced_name(&self) -> Option<&str> {
        match self {
            TypeDesc::Table(name) | TypeDesc::Enum(name) | TypeDesc::Union(name) => Some(name),
            TypeDesc::List(inner) | TypeDesc::Optional(inner) => inner.referenced_name(),
            _ => None,
        }
    }
}

impl From<ScalarKind> for TypeDesc {
    fn from(kind: ScalarKind) -> Self {
        TypeDesc::Scalar(kind)
    }
}

/// Renders in schema notation; optional types get a trailing `?`.
impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Scalar(kind) => write!(f, "{kind}"),
            TypeDesc::String => f.write_str("string"),
            TypeDesc::Bytes => f.write_str("[ubyte]"),
            TypeDesc::Table(name) | TypeDesc::Enum(name) | TypeDesc::Union(name) => {
                f.write_str(name)
            }
            TypeDesc::List(elem) => write!(f, "[{elem}]"),
            TypeDesc::Optional(inner) => write!(f, "{inner}?"),
        }
    }
}

/// A default value as written in a declaration.
///
/// It is resolved against the field's type during analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Bool(bool),
    Int(i128),
    Float(f64),
    /// An enum member name.
    Ident(String),
    /// Explicitly absent.
    Null,
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Bool(v) => write!(f, "{v}"),
            DefaultValue::Int(v) => write!(f, "{v}"),
            DefaultValue::Float(v) => write!(f, "{v}"),
            DefaultValue::Ident(name) => f.write_str(name),
            DefaultValue::Null => f.write_str("null"),
        }
    }
}

/// One declared field of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeDesc,
    pub default: Option<DefaultValue>,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: impl Into<TypeDesc>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            default: None,
        }
    }

    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}
