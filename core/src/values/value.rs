use core::fmt;
use std::sync::Arc;

use super::{Record, ScalarVector};
use crate::types::Scalar;

/// A member of an enum, carrying both its name and its integer value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    member: Arc<str>,
    value: i64,
}

impl EnumValue {
    pub fn new(member: impl Into<Arc<str>>, value: i64) -> Self {
        Self {
            member: member.into(),
            value,
        }
    }

    pub fn member(&self) -> &str {
        &self.member
    }

    pub fn value(&self) -> i64 {
        self.value
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.member)
    }
}

/// A present union value: the member's discriminant and its table.
///
/// Built with [`UnionDef::wrap`](crate::types::UnionDef::wrap), which looks
/// the discriminant up once so encoding never dispatches on the member type.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionValue {
    tag: u8,
    value: Arc<Record>,
}

impl UnionValue {
    pub(crate) fn new(tag: u8, value: Arc<Record>) -> Self {
        Self { tag, value }
    }

    pub fn tag(&self) -> u8 {
        self.tag
    }

    /// Name of the member table.
    pub fn member(&self) -> &str {
        self.value.table_name()
    }

    pub fn record(&self) -> &Arc<Record> {
        &self.value
    }
}

/// A field value.
///
/// Tables and byte blobs are reference counted. Encoding interns them by
/// pointer identity, so sharing one `Arc` across fields writes one payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Enum(EnumValue),
    Str(String),
    Bytes(Arc<[u8]>),
    Table(Arc<Record>),
    Strings(Vec<String>),
    Scalars(ScalarVector),
    Enums(Vec<EnumValue>),
    Tables(Vec<Arc<Record>>),
    Union(UnionValue),
    /// An absent optional field or nullable union.
    None,
}

impl Value {
    pub fn bytes(data: impl Into<Arc<[u8]>>) -> Self {
        Value::Bytes(data.into())
    }

    pub fn table(record: impl Into<Arc<Record>>) -> Self {
        Value::Table(record.into())
    }

    pub fn tables<I, R>(records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Arc<Record>>,
    {
        Value::Tables(records.into_iter().map(Into::into).collect())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Value::Scalar(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumValue> {
        match self {
            Value::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Arc<Record>> {
        match self {
            Value::Table(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            Value::Strings(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_scalars(&self) -> Option<&ScalarVector> {
        match self {
            Value::Scalars(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_enums(&self) -> Option<&[EnumValue]> {
        match self {
            Value::Enums(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_tables(&self) -> Option<&[Arc<Record>]> {
        match self {
            Value::Tables(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_union(&self) -> Option<&UnionValue> {
        match self {
            Value::Union(u) => Some(u),
            _ => None,
        }
    }

    /// Short description of the variant, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::Enum(_) => "enum",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Table(_) => "table",
            Value::Strings(_) => "string vector",
            Value::Scalars(_) => "scalar vector",
            Value::Enums(_) => "enum vector",
            Value::Tables(_) => "table vector",
            Value::Union(_) => "union",
            Value::None => "none",
        }
    }
}

macro_rules! value_from_scalar {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Scalar(Scalar::$variant(v))
                }
            }

            impl From<Vec<$ty>> for Value {
                fn from(v: Vec<$ty>) -> Self {
                    Value::Scalars(ScalarVector::$variant(v))
                }
            }
        )*
    };
}

value_from_scalar! {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl From<Scalar> for Value {
    fn from(v: Scalar) -> Self {
        Value::Scalar(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::Strings(v)
    }
}

impl From<Vec<&str>> for Value {
    fn from(v: Vec<&str>) -> Self {
        Value::Strings(v.into_iter().map(str::to_string).collect())
    }
}

impl From<ScalarVector> for Value {
    fn from(v: ScalarVector) -> Self {
        Value::Scalars(v)
    }
}

impl From<EnumValue> for Value {
    fn from(v: EnumValue) -> Self {
        Value::Enum(v)
    }
}

impl From<Vec<EnumValue>> for Value {
    fn from(v: Vec<EnumValue>) -> Self {
        Value::Enums(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Table(Arc::new(v))
    }
}

impl From<Arc<Record>> for Value {
    fn from(v: Arc<Record>) -> Self {
        Value::Table(v)
    }
}

impl From<UnionValue> for Value {
    fn from(v: UnionValue) -> Self {
        Value::Union(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::None, Into::into)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(s) => write!(f, "{s}"),
            Value::Enum(e) => write!(f, "{e}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => {
                f.write_str("b\"")?;
                for byte in b.iter() {
                    write!(f, "\\x{byte:02x}")?;
                }
                f.write_str("\"")
            }
            Value::Table(r) => write!(f, "{r}"),
            Value::Strings(v) => write_list(f, v.iter().map(|s| format!("{s:?}"))),
            Value::Scalars(v) => write_list(f, v.iter().map(|s| s.to_string())),
            Value::Enums(v) => write_list(f, v.iter().map(|e| e.to_string())),
            Value::Tables(v) => write_list(f, v.iter().map(|r| r.to_string())),
            Value::Union(u) => write!(f, "{}", u.value),
            Value::None => f.write_str("none"),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: impl Iterator<Item = String>) -> fmt::Result {
    f.write_str("[")?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        f.write_str(&item)?;
    }
    f.write_str("]")
}
