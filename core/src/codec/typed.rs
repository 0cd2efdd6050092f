//! Encoding and decoding of plain Rust structs.
//!
//! A struct opts in by implementing [`FlatTable`]: it names its table,
//! supplies the schema declaring it, and converts itself to and from a
//! [`Record`]. Codecs for such types are built once per process and shared.

use std::any::TypeId;
use std::sync::{Arc, PoisonError, RwLock};

use hashbrown::HashMap;
use once_cell::sync::Lazy;
use tracing::debug;

use super::Codec;
use crate::errors::{Error, Result};
use crate::types::{Scalar, Schema};
use crate::values::{EnumValue, Record, ScalarVector, UnionValue, Value};

/// A Rust type stored as a table.
///
/// # Example
///
/// ```
/// use flatrecord_core::codec::{self, Codec, FlatTable};
/// use flatrecord_core::types::{ScalarKind, Schema, TableDef, TypeDesc};
/// use flatrecord_core::values::Record;
///
/// #[derive(Debug, PartialEq)]
/// struct Common1 {
///     id: String,
///     count: u8,
/// }
///
/// impl FlatTable for Common1 {
///     const TABLE: &'static str = "Common1";
///
///     fn schema() -> Schema {
///         Schema::new().with_table(
///             TableDef::new("Common1")
///                 .field("id", TypeDesc::String)
///                 .field("count", ScalarKind::U8),
///         )
///     }
///
///     fn to_record(&self, codec: &Codec) -> flatrecord_core::Result<Record> {
///         codec
///             .builder(Self::TABLE)?
///             .set("id", self.id.as_str())
///             .set("count", self.count)
///             .build()
///     }
///
///     fn from_record(record: &Record) -> flatrecord_core::Result<Self> {
///         Ok(Self {
///             id: record.field("id")?,
///             count: record.field("count")?,
///         })
///     }
/// }
///
/// let value = Common1 { id: "abc".to_string(), count: 5 };
/// let bytes = codec::encode(&value)?;
/// assert_eq!(codec::decode::<Common1>(&bytes)?, value);
/// # Ok::<(), flatrecord_core::Error>(())
/// ```
pub trait FlatTable: Sized + 'static {
    /// Name of the table in [`schema`](Self::schema).
    const TABLE: &'static str;

    /// A schema declaring [`TABLE`](Self::TABLE) and every definition it
    /// refers to.
    fn schema() -> Schema;

    fn to_record(&self, codec: &Codec) -> Result<Record>;

    fn from_record(record: &Record) -> Result<Self>;
}

/// Conversion out of a field value. The inverse of `Into<Value>`.
pub trait FromValue: Sized {
    /// `None` when `value` is not of this type.
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! from_value_scalar {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::Scalar(Scalar::$variant(v)) => Some(*v),
                        _ => None,
                    }
                }
            }

            impl FromValue for Vec<$ty> {
                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::Scalars(ScalarVector::$variant(v)) => Some(v.clone()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

from_value_scalar! {
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

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for Vec<String> {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_strings().map(<[String]>::to_vec)
    }
}

impl FromValue for Arc<[u8]> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bytes(b) => Some(b.clone()),
            _ => None,
        }
    }
}

impl FromValue for EnumValue {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_enum().cloned()
    }
}

impl FromValue for Vec<EnumValue> {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_enums().map(<[EnumValue]>::to_vec)
    }
}

impl FromValue for Arc<Record> {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_table().cloned()
    }
}

impl FromValue for Vec<Arc<Record>> {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_tables().map(<[Arc<Record>]>::to_vec)
    }
}

impl FromValue for UnionValue {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_union().cloned()
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::None => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl Record {
    /// Value of the field called `name`, converted to `T`.
    pub fn field<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.get(name).ok_or_else(|| {
            Error::mismatch(self.table_name(), format!("no field named `{name}`"))
        })?;
        T::from_value(value).ok_or_else(|| Error::ValueMismatch {
            table: self.table_name().to_string(),
            field: name.to_string(),
            expected: format!(
                "{}, got {}",
                std::any::type_name::<T>(),
                value.kind_name()
            ),
        })
    }

    /// The nested table in field `name`, converted to `T`.
    pub fn nested<T: FlatTable>(&self, name: &str) -> Result<T> {
        let record = self.field::<Arc<Record>>(name)?;
        T::from_record(&record)
    }
}

static CODECS: Lazy<RwLock<HashMap<TypeId, Arc<Codec>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// The shared codec of `T`, built and checked on first use.
///
/// A type whose table fails to analyze is not cached and fails the same way
/// on every call.
pub fn codec_for<T: FlatTable>() -> Result<Arc<Codec>> {
    let id = TypeId::of::<T>();
    if let Some(codec) = CODECS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
    {
        return Ok(codec.clone());
    }

    let codec = Arc::new(Codec::new(T::schema()));
    codec.plan(T::TABLE)?;

    let mut codecs = CODECS.write().unwrap_or_else(PoisonError::into_inner);
    let codec = codecs.entry(id).or_insert_with(|| {
        debug!(table = T::TABLE, ty = std::any::type_name::<T>(), "Registered codec");
        codec
    });
    Ok(codec.clone())
}

pub fn encode<T: FlatTable>(value: &T) -> Result<Vec<u8>> {
    let codec = codec_for::<T>()?;
    codec.encode(&value.to_record(&codec)?)
}

pub fn decode<T: FlatTable>(bytes: &[u8]) -> Result<T> {
    let codec = codec_for::<T>()?;
    T::from_record(&codec.decode(T::TABLE, bytes)?)
}
