//! Fixed-width scalar kinds and values.

use core::fmt;

/// Expand `$body` once per scalar kind, with `$t` naming the kind's Rust type.
macro_rules! with_scalar_type {
    ($kind:expr, $t:ident => $body:expr) => {
        match $kind {
            $crate::types::ScalarKind::Bool => {
                type $t = bool;
                $body
            }
            $crate::types::ScalarKind::U8 => {
                type $t = u8;
                $body
            }
            $crate::types::ScalarKind::U16 => {
                type $t = u16;
                $body
            }
            $crate::types::ScalarKind::U32 => {
                type $t = u32;
                $body
            }
            $crate::types::ScalarKind::U64 => {
                type $t = u64;
                $body
            }
            $crate::types::ScalarKind::I8 => {
                type $t = i8;
                $body
            }
            $crate::types::ScalarKind::I16 => {
                type $t = i16;
                $body
            }
            $crate::types::ScalarKind::I32 => {
                type $t = i32;
                $body
            }
            $crate::types::ScalarKind::I64 => {
                type $t = i64;
                $body
            }
            $crate::types::ScalarKind::F32 => {
                type $t = f32;
                $body
            }
            $crate::types::ScalarKind::F64 => {
                type $t = f64;
                $body
            }
        }
    };
}

pub(crate) use with_scalar_type;

/// The fixed-width scalar types of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 11] = [
        ScalarKind::Bool,
        ScalarKind::U8,
        ScalarKind::U16,
        ScalarKind::U32,
        ScalarKind::U64,
        ScalarKind::I8,
        ScalarKind::I16,
        ScalarKind::I32,
        ScalarKind::I64,
        ScalarKind::F32,
        ScalarKind::F64,
    ];

    /// Size in bytes of one value of this kind.
    pub const fn width(self) -> usize {
        match self {
            ScalarKind::Bool | ScalarKind::U8 | ScalarKind::I8 => 1,
            ScalarKind::U16 | ScalarKind::I16 => 2,
            ScalarKind::U32 | ScalarKind::I32 | ScalarKind::F32 => 4,
            ScalarKind::U64 | ScalarKind::I64 | ScalarKind::F64 => 8,
        }
    }

    pub const fn is_integer(self) -> bool {
        !matches!(self, ScalarKind::Bool | ScalarKind::F32 | ScalarKind::F64)
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            ScalarKind::I8 | ScalarKind::I16 | ScalarKind::I32 | ScalarKind::I64
        )
    }

    /// Canonical schema spelling.
    pub const fn name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::U8 => "ubyte",
            ScalarKind::U16 => "ushort",
            ScalarKind::U32 => "uint",
            ScalarKind::U64 => "ulong",
            ScalarKind::I8 => "byte",
            ScalarKind::I16 => "short",
            ScalarKind::I32 => "int",
            ScalarKind::I64 => "long",
            ScalarKind::F32 => "float",
            ScalarKind::F64 => "double",
        }
    }

    /// Parse any of the schema spellings, including the sized aliases.
    pub fn from_schema_name(name: &str) -> Option<Self> {
        let kind = match name {
            "bool" => ScalarKind::Bool,
            "ubyte" | "uint8" => ScalarKind::U8,
            "ushort" | "uint16" => ScalarKind::U16,
            "uint" | "uint32" => ScalarKind::U32,
            "ulong" | "uint64" => ScalarKind::U64,
            "byte" | "int8" => ScalarKind::I8,
            "short" | "int16" => ScalarKind::I16,
            "int" | "int32" => ScalarKind::I32,
            "long" | "int64" => ScalarKind::I64,
            "float" | "float32" => ScalarKind::F32,
            "double" | "float64" => ScalarKind::F64,
            _ => return None,
        };
        Some(kind)
    }

    /// The zero value of this kind (`false` for bools).
    pub const fn zero(self) -> Scalar {
        match self {
            ScalarKind::Bool => Scalar::Bool(false),
            ScalarKind::U8 => Scalar::U8(0),
            ScalarKind::U16 => Scalar::U16(0),
            ScalarKind::U32 => Scalar::U32(0),
            ScalarKind::U64 => Scalar::U64(0),
            ScalarKind::I8 => Scalar::I8(0),
            ScalarKind::I16 => Scalar::I16(0),
            ScalarKind::I32 => Scalar::I32(0),
            ScalarKind::I64 => Scalar::I64(0),
            ScalarKind::F32 => Scalar::F32(0.0),
            ScalarKind::F64 => Scalar::F64(0.0),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single scalar value, tagged with its kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
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

impl Scalar {
    pub const fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Bool(_) => ScalarKind::Bool,
            Scalar::U8(_) => ScalarKind::U8,
            Scalar::U16(_) => ScalarKind::U16,
            Scalar::U32(_) => ScalarKind::U32,
            Scalar::U64(_) => ScalarKind::U64,
            Scalar::I8(_) => ScalarKind::I8,
            Scalar::I16(_) => ScalarKind::I16,
            Scalar::I32(_) => ScalarKind::I32,
            Scalar::I64(_) => ScalarKind::I64,
            Scalar::F32(_) => ScalarKind::F32,
            Scalar::F64(_) => ScalarKind::F64,
        }
    }

    /// Build an integer scalar of `kind`, or `None` if `value` does not fit.
    pub fn from_i128(kind: ScalarKind, value: i128) -> Option<Scalar> {
        let scalar = match kind {
            ScalarKind::U8 => Scalar::U8(u8::try_from(value).ok()?),
            ScalarKind::U16 => Scalar::U16(u16::try_from(value).ok()?),
            ScalarKind::U32 => Scalar::U32(u32::try_from(value).ok()?),
            ScalarKind::U64 => Scalar::U64(u64::try_from(value).ok()?),
            ScalarKind::I8 => Scalar::I8(i8::try_from(value).ok()?),
            ScalarKind::I16 => Scalar::I16(i16::try_from(value).ok()?),
            ScalarKind::I32 => Scalar::I32(i32::try_from(value).ok()?),
            ScalarKind::I64 => Scalar::I64(i64::try_from(value).ok()?),
            ScalarKind::F32 => Scalar::F32(value as f32),
            ScalarKind::F64 => Scalar::F64(value as f64),
            ScalarKind::Bool => match value {
                0 => Scalar::Bool(false),
                1 => Scalar::Bool(true),
                _ => return None,
            },
        };
        Some(scalar)
    }

    /// Integer value, for integer kinds and bools.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Scalar::Bool(b) => Some(b as i128),
            Scalar::U8(v) => Some(v.into()),
            Scalar::U16(v) => Some(v.into()),
            Scalar::U32(v) => Some(v.into()),
            Scalar::U64(v) => Some(v.into()),
            Scalar::I8(v) => Some(v.into()),
            Scalar::I16(v) => Some(v.into()),
            Scalar::I32(v) => Some(v.into()),
            Scalar::I64(v) => Some(v.into()),
            Scalar::F32(_) | Scalar::F64(_) => None,
        }
    }
}

macro_rules! scalar_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(v: $ty) -> Self {
                    Scalar::$variant(v)
                }
            }
        )*
    };
}

scalar_from! {
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

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::U8(v) => write!(f, "{v}"),
            Scalar::U16(v) => write!(f, "{v}"),
            Scalar::U32(v) => write!(f, "{v}"),
            Scalar::U64(v) => write!(f, "{v}"),
            Scalar::I8(v) => write!(f, "{v}"),
            Scalar::I16(v) => write!(f, "{v}"),
            Scalar::I32(v) => write!(f, "{v}"),
            Scalar::I64(v) => write!(f, "{v}"),
            Scalar::F32(v) => write!(f, "{v}"),
            Scalar::F64(v) => write!(f, "{v}"),
        }
    }
}
