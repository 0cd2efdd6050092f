//! Table, enum and union definitions.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{DefaultValue, FieldDecl, ScalarKind, TypeDesc};
use crate::errors::{Error, Result};
use crate::values::{EnumValue, Record, UnionValue};

/// A table type: an ordered list of field declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    pub name: String,
    pub fields: Vec<FieldDecl>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, ty: impl Into<TypeDesc>) -> Self {
        self.fields.push(FieldDecl::new(name, ty));
        self
    }

    pub fn field_with_default(
        mut self,
        name: impl Into<String>,
        ty: impl Into<TypeDesc>,
        default: DefaultValue,
    ) -> Self {
        self.fields.push(FieldDecl::new(name, ty).with_default(default));
        self
    }

    pub fn push_field(&mut self, field: FieldDecl) {
        self.fields.push(field);
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub name: String,
    pub value: i64,
}

/// An enum over an integer base type.
///
/// The base is not checked here; a non-integer base is reported when a
/// field using the enum is classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    pub name: String,
    pub base: ScalarKind,
    pub members: Vec<EnumMember>,
}

impl EnumDef {
    pub fn new(name: impl Into<String>, base: ScalarKind) -> Self {
        Self {
            name: name.into(),
            base,
            members: Vec::new(),
        }
    }

    /// Add a member numbered one past the previous member (or 0).
    pub fn member(self, name: impl Into<String>) -> Self {
        let next = self.members.last().map_or(0, |m| m.value + 1);
        self.member_with_value(name, next)
    }

    pub fn member_with_value(mut self, name: impl Into<String>, value: i64) -> Self {
        self.members.push(EnumMember {
            name: name.into(),
            value,
        });
        self
    }

    pub fn value_of(&self, member: &str) -> Option<i64> {
        self.members
            .iter()
            .find(|m| m.name == member)
            .map(|m| m.value)
    }

    pub fn member_named(&self, value: i64) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.value == value)
            .map(|m| m.name.as_str())
    }

    /// The member used when a field declares no default: the zero member,
    /// or the first declared member if none is zero.
    pub fn default_member(&self) -> Option<&EnumMember> {
        self.members
            .iter()
            .find(|m| m.value == 0)
            .or_else(|| self.members.first())
    }

    /// Build a value of this enum from a member name.
    pub fn value(&self, member: &str) -> Result<EnumValue> {
        let value = self
            .value_of(member)
            .ok_or_else(|| Error::mismatch(&self.name, format!("no member named `{member}`")))?;
        Ok(EnumValue::new(member, value))
    }

    /// Build a value of this enum from its raw integer.
    pub fn from_raw(&self, value: i64) -> Option<EnumValue> {
        self.member_named(value).map(|name| EnumValue::new(name, value))
    }

    /// Check a hand-written enum against a schema-derived reference.
    ///
    /// The names must match, and every member of `self` must exist in
    /// `reference` with the same value.
    pub fn validate_against(&self, reference: &EnumDef) -> Result<()> {
        if self.name != reference.name {
            return Err(Error::mismatch(
                &self.name,
                format!("names don't match: {}/{}", self.name, reference.name),
            ));
        }
        for member in &self.members {
            match reference.value_of(&member.name) {
                Some(value) if value == member.value => {}
                Some(value) => {
                    return Err(Error::mismatch(
                        format!("{}.{}", self.name, member.name),
                        format!("value {} doesn't match {}", member.value, value),
                    ));
                }
                None => {
                    return Err(Error::mismatch(
                        format!("{}.{}", self.name, member.name),
                        "member missing from the reference enum",
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionMember {
    /// Name of the member's table type.
    pub table: String,
    /// Explicit discriminant, if declared.
    pub tag: Option<u32>,
}

/// A union of table types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionDef {
    pub name: String,
    pub members: Vec<UnionMember>,
}

impl UnionDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn member(mut self, table: impl Into<String>) -> Self {
        self.members.push(UnionMember {
            table: table.into(),
            tag: None,
        });
        self
    }

    pub fn member_with_tag(mut self, table: impl Into<String>, tag: u32) -> Self {
        self.members.push(UnionMember {
            table: table.into(),
            tag: Some(tag),
        });
        self
    }

    /// Number the members.
    ///
    /// Members count up from 1 in declaration order. An explicit tag resets
    /// the counter, and later members continue after it. 0 is reserved for
    /// "absent".
    pub fn mapping(&self) -> Result<UnionMapping> {
        let mut by_tag = BTreeMap::new();
        let mut next: u32 = 1;
        for member in &self.members {
            let tag = member.tag.unwrap_or(next);
            let tag = match u8::try_from(tag) {
                Ok(0) => {
                    return Err(Error::mismatch(
                        &self.name,
                        format!("member `{}` uses the reserved tag 0", member.table),
                    ));
                }
                Ok(tag) => tag,
                Err(_) => {
                    return Err(Error::mismatch(
                        &self.name,
                        format!("tag {tag} of member `{}` does not fit in a u8", member.table),
                    ));
                }
            };
            let table: Arc<str> = Arc::from(member.table.as_str());
            if let Some(previous) = by_tag.insert(tag, table) {
                return Err(Error::mismatch(
                    &self.name,
                    format!(
                        "tag {tag} is used by both `{previous}` and `{}`",
                        member.table
                    ),
                ));
            }
            next = u32::from(tag) + 1;
        }
        Ok(UnionMapping { by_tag })
    }

    /// Wrap a record as a value of this union, resolving its discriminant.
    pub fn wrap(&self, record: impl Into<Arc<Record>>) -> Result<UnionValue> {
        let record = record.into();
        let mapping = self.mapping()?;
        let tag = mapping.tag_of(record.table_name()).ok_or_else(|| {
            Error::mismatch(
                &self.name,
                format!("`{}` is not a member of this union", record.table_name()),
            )
        })?;
        Ok(UnionValue::new(tag, record))
    }
}

/// Dense `discriminant -> member table` map of a union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionMapping {
    by_tag: BTreeMap<u8, Arc<str>>,
}

impl UnionMapping {
    pub fn member(&self, tag: u8) -> Option<&Arc<str>> {
        self.by_tag.get(&tag)
    }

    pub fn tag_of(&self, table: &str) -> Option<u8> {
        self.by_tag
            .iter()
            .find(|(_, name)| name.as_ref() == table)
            .map(|(tag, _)| *tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &str)> {
        self.by_tag.iter().map(|(tag, name)| (*tag, name.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_mapping_counts_from_one() {
        let def = UnionDef::new("U").member("A").member("B");
        let mapping = def.mapping().unwrap();
        assert_eq!(mapping.iter().collect::<Vec<_>>(), vec![(1, "A"), (2, "B")]);
    }

    #[test]
    fn test_union_mapping_explicit_tags_continue() {
        let def = UnionDef::new("U")
            .member("A")
            .member_with_tag("B", 5)
            .member("C");
        let mapping = def.mapping().unwrap();
        assert_eq!(
            mapping.iter().collect::<Vec<_>>(),
            vec![(1, "A"), (5, "B"), (6, "C")]
        );
    }

    #[test]
    fn test_union_mapping_rejects_reserved_and_duplicates() {
        let zero = UnionDef::new("U").member_with_tag("A", 0);
        assert!(matches!(zero.mapping(), Err(Error::SchemaMismatch { .. })));

        let dup = UnionDef::new("U").member_with_tag("A", 2).member_with_tag("B", 2);
        assert!(matches!(dup.mapping(), Err(Error::SchemaMismatch { .. })));

        let wide = UnionDef::new("U").member_with_tag("A", 256);
        assert!(matches!(wide.mapping(), Err(Error::SchemaMismatch { .. })));
    }

    #[test]
    fn test_enum_auto_numbering() {
        let def = EnumDef::new("E", ScalarKind::U8)
            .member("ONE")
            .member_with_value("FIVE", 5)
            .member("SIX");
        assert_eq!(def.value_of("ONE"), Some(0));
        assert_eq!(def.value_of("SIX"), Some(6));
        assert_eq!(def.member_named(5), Some("FIVE"));
    }

    #[test]
    fn test_enum_default_member() {
        let zero_first = EnumDef::new("E", ScalarKind::U8).member("A").member("B");
        assert_eq!(zero_first.default_member().unwrap().name, "A");

        let no_zero = EnumDef::new("E", ScalarKind::U8)
            .member_with_value("X", 3)
            .member("Y");
        assert_eq!(no_zero.default_member().unwrap().name, "X");
    }

    #[test]
    fn test_enum_validate_against() {
        let reference = EnumDef::new("ASimpleUByteEnum", ScalarKind::U8)
            .member("ONE")
            .member("TWO")
            .member("THREE");

        let subset = EnumDef::new("ASimpleUByteEnum", ScalarKind::U8)
            .member("ONE")
            .member("TWO");
        assert!(subset.validate_against(&reference).is_ok());

        let wrong_value = EnumDef::new("ASimpleUByteEnum", ScalarKind::U8)
            .member_with_value("TWO", 7);
        assert!(matches!(
            wrong_value.validate_against(&reference),
            Err(Error::SchemaMismatch { .. })
        ));

        let extra = EnumDef::new("ASimpleUByteEnum", ScalarKind::U8).member("FOUR");
        assert!(extra.validate_against(&reference).is_err());

        let renamed = EnumDef::new("Other", ScalarKind::U8).member("ONE");
        assert!(renamed.validate_against(&reference).is_err());
    }
}
