//! Maps one declared field onto its wire-layout category.

use core::fmt;
use std::sync::Arc;

use crate::errors::{Error, Result};
use crate::types::{
    DefaultValue, DefinitionKind, EnumDef, FieldDecl, Scalar, ScalarKind, Schema, TypeDesc,
    UnionDef, UnionMapping,
};
use crate::values::{EnumValue, ScalarVector, Value};

/// How a field is laid out on the wire.
///
/// Optionality is a flag on each reference category. Unions carry it as
/// `nullable`, since "absent" is their reserved discriminant 0.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCategory {
    Inline {
        kind: ScalarKind,
        default: Scalar,
    },
    EnumInline {
        def: Arc<EnumDef>,
        kind: ScalarKind,
        default: EnumValue,
    },
    StringRef {
        optional: bool,
    },
    BytesRef {
        optional: bool,
    },
    TableRef {
        table: Arc<str>,
        optional: bool,
    },
    StringVec {
        optional: bool,
    },
    ScalarVec {
        kind: ScalarKind,
        optional: bool,
    },
    EnumVec {
        def: Arc<EnumDef>,
        kind: ScalarKind,
        optional: bool,
    },
    TableVec {
        table: Arc<str>,
        optional: bool,
    },
    /// Occupies two slots: the `u8` discriminant and the member's offset.
    Union {
        def: Arc<UnionDef>,
        mapping: UnionMapping,
        nullable: bool,
    },
}

impl FieldCategory {
    /// Number of vtable slots the field occupies.
    pub fn slot_count(&self) -> u16 {
        match self {
            FieldCategory::Union { .. } => 2,
            _ => 1,
        }
    }

    /// True when an absent value is representable on the wire.
    pub fn is_optional(&self) -> bool {
        match self {
            FieldCategory::Inline { .. } | FieldCategory::EnumInline { .. } => false,
            FieldCategory::StringRef { optional }
            | FieldCategory::BytesRef { optional }
            | FieldCategory::TableRef { optional, .. }
            | FieldCategory::StringVec { optional }
            | FieldCategory::ScalarVec { optional, .. }
            | FieldCategory::EnumVec { optional, .. }
            | FieldCategory::TableVec { optional, .. } => *optional,
            FieldCategory::Union { nullable, .. } => *nullable,
        }
    }

    /// The value a field takes when none is given.
    ///
    /// Required vectors default to empty, as an absent one decodes. `None`
    /// for the other required reference fields, which have no default.
    pub fn default_value(&self) -> Option<Value> {
        match self {
            FieldCategory::Inline { default, .. } => Some(Value::Scalar(*default)),
            FieldCategory::EnumInline { default, .. } => Some(Value::Enum(default.clone())),
            _ if self.is_optional() => Some(Value::None),
            FieldCategory::StringVec { .. } => Some(Value::Strings(Vec::new())),
            FieldCategory::ScalarVec { kind, .. } => {
                Some(Value::Scalars(ScalarVector::with_capacity(*kind, 0)))
            }
            FieldCategory::EnumVec { .. } => Some(Value::Enums(Vec::new())),
            FieldCategory::TableVec { .. } => Some(Value::Tables(Vec::new())),
            _ => None,
        }
    }

    /// Best-effort conversion of `value` to the shape this category stores.
    ///
    /// Numbers are converted to the field's scalar kind when they fit, and
    /// enum members may be given by name. Anything else is passed through
    /// unchanged for the encoder to reject.
    pub fn coerce(&self, value: Value) -> Value {
        match (self, value) {
            (FieldCategory::Inline { kind, .. }, Value::Scalar(s)) => {
                Value::Scalar(convert_scalar(*kind, s).unwrap_or(s))
            }
            (FieldCategory::EnumInline { def, .. }, Value::Str(name)) => match def.value(&name) {
                Ok(member) => Value::Enum(member),
                Err(_) => Value::Str(name),
            },
            (FieldCategory::EnumInline { def, .. }, Value::Scalar(s)) => {
                match s.as_i128().and_then(|v| i64::try_from(v).ok()) {
                    Some(raw) => def.from_raw(raw).map_or(Value::Scalar(s), Value::Enum),
                    None => Value::Scalar(s),
                }
            }
            (FieldCategory::ScalarVec { kind, .. }, Value::Scalars(v)) if v.kind() != *kind => {
                let converted: Option<Vec<Scalar>> =
                    v.iter().map(|s| convert_scalar(*kind, s)).collect();
                match converted.and_then(|s| ScalarVector::from_scalars(*kind, &s)) {
                    Some(converted) => Value::Scalars(converted),
                    None => Value::Scalars(v),
                }
            }
            (_, value) => value,
        }
    }
}

fn convert_scalar(kind: ScalarKind, value: Scalar) -> Option<Scalar> {
    if value.kind() == kind {
        return Some(value);
    }
    match (kind, value) {
        (ScalarKind::F32, Scalar::F64(v)) => Some(Scalar::F32(v as f32)),
        (ScalarKind::F64, Scalar::F32(v)) => Some(Scalar::F64(v.into())),
        (ScalarKind::Bool, _) => None,
        _ => Scalar::from_i128(kind, value.as_i128()?),
    }
}

impl fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opt = |optional: bool| if optional { "?" } else { "" };
        match self {
            FieldCategory::Inline { kind, default } => write!(f, "inline {kind} = {default}"),
            FieldCategory::EnumInline { def, default, .. } => {
                write!(f, "enum {} = {default}", def.name)
            }
            FieldCategory::StringRef { optional } => write!(f, "string{}", opt(*optional)),
            FieldCategory::BytesRef { optional } => write!(f, "bytes{}", opt(*optional)),
            FieldCategory::TableRef { table, optional } => {
                write!(f, "table {table}{}", opt(*optional))
            }
            FieldCategory::StringVec { optional } => write!(f, "[string]{}", opt(*optional)),
            FieldCategory::ScalarVec { kind, optional } => write!(f, "[{kind}]{}", opt(*optional)),
            FieldCategory::EnumVec { def, optional, .. } => {
                write!(f, "[enum {}]{}", def.name, opt(*optional))
            }
            FieldCategory::TableVec { table, optional } => {
                write!(f, "[table {table}]{}", opt(*optional))
            }
            FieldCategory::Union { def, nullable, .. } => {
                write!(f, "union {}{}", def.name, opt(*nullable))
            }
        }
    }
}

/// Classify one field of `table`.
///
/// Named references resolve by what `schema` defines under the name, so a
/// `TypeDesc::Table` naming an enum classifies as an enum.
pub fn classify(schema: &Schema, table: &str, field: &FieldDecl) -> Result<FieldCategory> {
    let cx = Cx {
        schema,
        table,
        field,
    };
    cx.classify()
}

struct Cx<'a> {
    schema: &'a Schema,
    table: &'a str,
    field: &'a FieldDecl,
}

/// A named type after lookup.
enum Named {
    Table(Arc<str>),
    Enum(Arc<EnumDef>),
    Union(Arc<UnionDef>),
}

impl Cx<'_> {
    fn classify(&self) -> Result<FieldCategory> {
        let category = match &self.field.ty {
            TypeDesc::Optional(inner) => self.classify_optional(inner)?,
            ty => self.classify_plain(ty, false)?,
        };
        self.check_default(&category)?;
        Ok(category)
    }

    fn classify_optional(&self, inner: &TypeDesc) -> Result<FieldCategory> {
        match inner {
            TypeDesc::Scalar(_) => Err(self.unsupported("optional scalars are not supported")),
            TypeDesc::Optional(_) => Err(self.unsupported("nested optionals are not supported")),
            ty => {
                let category = self.classify_plain(ty, true)?;
                if let FieldCategory::EnumInline { .. } = category {
                    return Err(self.unsupported("optional enums are not supported"));
                }
                Ok(category)
            }
        }
    }

    fn classify_plain(&self, ty: &TypeDesc, optional: bool) -> Result<FieldCategory> {
        match ty {
            TypeDesc::Scalar(kind) => Ok(FieldCategory::Inline {
                kind: *kind,
                default: self.scalar_default(*kind)?,
            }),
            TypeDesc::String => Ok(FieldCategory::StringRef { optional }),
            TypeDesc::Bytes => Ok(FieldCategory::BytesRef { optional }),
            TypeDesc::Table(name) | TypeDesc::Enum(name) | TypeDesc::Union(name) => {
                match self.lookup(name)? {
                    Named::Table(table) => Ok(FieldCategory::TableRef { table, optional }),
                    Named::Enum(def) => {
                        let kind = self.enum_base(&def)?;
                        let default = self.enum_default(&def)?;
                        Ok(FieldCategory::EnumInline { def, kind, default })
                    }
                    Named::Union(def) => {
                        let mapping = self.union_mapping(&def)?;
                        Ok(FieldCategory::Union {
                            def,
                            mapping,
                            nullable: optional,
                        })
                    }
                }
            }
            TypeDesc::List(elem) => self.classify_list(elem, optional),
            TypeDesc::Optional(_) => Err(self.unsupported("nested optionals are not supported")),
        }
    }

    fn classify_list(&self, elem: &TypeDesc, optional: bool) -> Result<FieldCategory> {
        match elem {
            TypeDesc::Scalar(kind) => Ok(FieldCategory::ScalarVec {
                kind: *kind,
                optional,
            }),
            TypeDesc::String => Ok(FieldCategory::StringVec { optional }),
            TypeDesc::Table(name) | TypeDesc::Enum(name) | TypeDesc::Union(name) => {
                match self.lookup(name)? {
                    Named::Table(table) => Ok(FieldCategory::TableVec { table, optional }),
                    Named::Enum(def) => {
                        let kind = self.enum_base(&def)?;
                        Ok(FieldCategory::EnumVec {
                            def,
                            kind,
                            optional,
                        })
                    }
                    Named::Union(_) => Err(self.unsupported("vectors of unions are not supported")),
                }
            }
            TypeDesc::Bytes | TypeDesc::List(_) => {
                Err(self.unsupported("vectors of vectors are not supported"))
            }
            TypeDesc::Optional(_) => {
                Err(self.unsupported("vectors of optional elements are not supported"))
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<Named> {
        let unknown = || self.unsupported(format!("unknown type `{name}`"));
        match self.schema.kind_of(name).ok_or_else(unknown)? {
            DefinitionKind::Table => {
                let def = self.schema.table(name).ok_or_else(unknown)?;
                Ok(Named::Table(Arc::from(def.name.as_str())))
            }
            DefinitionKind::Enum => Ok(Named::Enum(
                self.schema.enum_def(name).ok_or_else(unknown)?.clone(),
            )),
            DefinitionKind::Union => Ok(Named::Union(
                self.schema.union_def(name).ok_or_else(unknown)?.clone(),
            )),
        }
    }

    fn enum_base(&self, def: &EnumDef) -> Result<ScalarKind> {
        if !def.base.is_integer() {
            return Err(self.unsupported(format!(
                "enum `{}` has non-integer base type `{}`",
                def.name, def.base
            )));
        }
        for member in &def.members {
            if Scalar::from_i128(def.base, member.value.into()).is_none() {
                return Err(Error::mismatch(
                    format!("{}.{}", def.name, member.name),
                    format!("value {} does not fit in `{}`", member.value, def.base),
                ));
            }
        }
        Ok(def.base)
    }

    fn union_mapping(&self, def: &UnionDef) -> Result<UnionMapping> {
        let mapping = def.mapping().map_err(|err| match err {
            Error::SchemaMismatch { context, reason } => {
                self.mismatch(format!("union `{context}`: {reason}"))
            }
            err => err,
        })?;
        for (_, member) in mapping.iter() {
            if self.schema.table(member).is_none() {
                return Err(self.mismatch(format!(
                    "member `{member}` of union `{}` is not a table in this schema",
                    def.name
                )));
            }
        }
        Ok(mapping)
    }

    fn scalar_default(&self, kind: ScalarKind) -> Result<Scalar> {
        let Some(default) = &self.field.default else {
            return Ok(kind.zero());
        };
        let scalar = match (kind, default) {
            (ScalarKind::Bool, DefaultValue::Bool(b)) => Some(Scalar::Bool(*b)),
            (ScalarKind::F32, DefaultValue::Float(v)) => Some(Scalar::F32(*v as f32)),
            (ScalarKind::F64, DefaultValue::Float(v)) => Some(Scalar::F64(*v)),
            (_, DefaultValue::Int(v)) => Scalar::from_i128(kind, *v),
            _ => None,
        };
        scalar.ok_or_else(|| self.invalid_default(format!("`{default}` is not a valid `{kind}`")))
    }

    fn enum_default(&self, def: &EnumDef) -> Result<EnumValue> {
        match &self.field.default {
            None => def
                .default_member()
                .map(|m| EnumValue::new(m.name.as_str(), m.value))
                .ok_or_else(|| self.invalid_default(format!("enum `{}` has no members", def.name))),
            Some(DefaultValue::Ident(name)) => {
                // Defaults may be written qualified, as `Color.Red`.
                let name = name.rsplit('.').next().unwrap_or(name);
                def.value(name).map_err(|_| {
                    self.invalid_default(format!("`{name}` is not a member of `{}`", def.name))
                })
            }
            Some(DefaultValue::Int(v)) => i64::try_from(*v)
                .ok()
                .and_then(|v| def.from_raw(v))
                .ok_or_else(|| {
                    self.invalid_default(format!("{v} is not a value of `{}`", def.name))
                }),
            Some(other) => {
                Err(self.invalid_default(format!("`{other}` is not a member of `{}`", def.name)))
            }
        }
    }

    /// Reference fields take no default except an explicit `null` on an
    /// optional field.
    fn check_default(&self, category: &FieldCategory) -> Result<()> {
        match (category, &self.field.default) {
            (FieldCategory::Inline { .. } | FieldCategory::EnumInline { .. }, _) | (_, None) => {
                Ok(())
            }
            (_, Some(DefaultValue::Null)) if category.is_optional() => Ok(()),
            (_, Some(DefaultValue::Null)) => {
                Err(self.invalid_default("only optional fields can default to null"))
            }
            (_, Some(_)) => Err(self.invalid_default("only scalar and enum fields take defaults")),
        }
    }

    fn unsupported(&self, reason: impl Into<String>) -> Error {
        Error::UnsupportedType {
            table: self.table.to_string(),
            field: self.field.name.clone(),
            ty: self.field.ty.to_string(),
            reason: reason.into(),
        }
    }

    fn mismatch(&self, reason: impl Into<String>) -> Error {
        Error::mismatch(format!("{}.{}", self.table, self.field.name), reason)
    }

    fn invalid_default(&self, reason: impl Into<String>) -> Error {
        Error::InvalidDefault {
            table: self.table.to_string(),
            field: self.field.name.clone(),
            reason: reason.into(),
        }
    }
}
