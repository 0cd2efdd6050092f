use std::sync::Arc;

use crate::analyzer::analyze;
use crate::errors::Error;
use crate::types::{
    DefaultValue, EnumDef, Scalar, ScalarKind, Schema, TableDef, TypeDesc, UnionDef,
};
use crate::values::{EnumValue, Record, RecordBuilder, ScalarVector, Value};
use pretty_assertions::assert_eq;

fn schema() -> Schema {
    Schema::new()
        .with_enum(
            EnumDef::new("Color", ScalarKind::I8)
                .member("Red")
                .member("Green")
                .member("Blue"),
        )
        .with_table(TableDef::new("Inner").field("v", ScalarKind::U32))
        .with_table(TableDef::new("Other").field("w", ScalarKind::U32))
        .with_union(UnionDef::new("Any").member("Inner").member_with_tag("Other", 5))
        .with_table(
            TableDef::new("Outer")
                .field_with_default("count", ScalarKind::U8, DefaultValue::Int(7))
                .field("ratio", ScalarKind::F64)
                .field_with_default(
                    "color",
                    TypeDesc::enumeration("Color"),
                    DefaultValue::Ident("Blue".to_string()),
                )
                .field("name", TypeDesc::optional(TypeDesc::String))
                .field("id", TypeDesc::String)
                .field("weights", TypeDesc::optional(TypeDesc::list(ScalarKind::I16.into())))
                .field("any", TypeDesc::optional(TypeDesc::union("Any"))),
        )
}

fn builder(table: &str) -> RecordBuilder {
    RecordBuilder::new(Arc::new(analyze(&schema(), table).unwrap()))
}

#[test]
fn test_builder_fills_defaults() {
    let record = builder("Outer").set("id", "x").build().unwrap();
    assert_eq!(record.get("count"), Some(&Value::Scalar(Scalar::U8(7))));
    assert_eq!(record.get("ratio"), Some(&Value::Scalar(Scalar::F64(0.0))));
    assert_eq!(record.get("color"), Some(&Value::Enum(EnumValue::new("Blue", 2))));
    assert_eq!(record.get("name"), Some(&Value::None));
    assert_eq!(record.get("weights"), Some(&Value::None));
    assert_eq!(record.get("any"), Some(&Value::None));
}

#[test]
fn test_builder_missing_required_field() {
    let err = builder("Outer").set("count", 1).build().unwrap_err();
    assert_eq!(
        err,
        Error::MissingField {
            table: "Outer".to_string(),
            field: "id".to_string(),
        }
    );
}

#[test]
fn test_builder_unknown_field_is_reported_on_build() {
    let err = builder("Outer")
        .set("nope", 1)
        .set("id", "x")
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch { ref reason, .. } if reason.contains("nope")));
}

#[test]
fn test_builder_coerces_numbers_to_field_kind() {
    let record = builder("Outer")
        .set("id", "x")
        .set("count", 200i64)
        .set("ratio", 3)
        .set("weights", vec![1i32, -2, 3])
        .build()
        .unwrap();
    assert_eq!(record.get("count"), Some(&Value::Scalar(Scalar::U8(200))));
    assert_eq!(record.get("ratio"), Some(&Value::Scalar(Scalar::F64(3.0))));
    assert_eq!(
        record.get("weights"),
        Some(&Value::Scalars(ScalarVector::I16(vec![1, -2, 3])))
    );
}

#[test]
fn test_builder_keeps_values_that_do_not_fit() {
    // Out of range for a ubyte: left as is, so encoding reports the mismatch.
    let record = builder("Outer").set("id", "x").set("count", 300).build().unwrap();
    assert_eq!(record.get("count"), Some(&Value::Scalar(Scalar::I32(300))));
}

#[test]
fn test_builder_resolves_enum_names_and_values() {
    let by_name = builder("Outer").set("id", "x").set("color", "Green").build().unwrap();
    let by_value = builder("Outer").set("id", "x").set("color", 1i8).build().unwrap();
    assert_eq!(by_name.get("color"), Some(&Value::Enum(EnumValue::new("Green", 1))));
    assert_eq!(by_name, by_value);
}

#[test]
fn test_record_checks_value_count() {
    let def = Arc::new(TableDef::new("Inner").field("v", ScalarKind::U32));
    assert!(matches!(
        Record::new(def.clone(), vec![]),
        Err(Error::SchemaMismatch { .. })
    ));
    let record = Record::new(def, vec![Value::from(1u32)]).unwrap();
    let fields: Vec<_> = record.iter().map(|(name, _)| name).collect();
    assert_eq!(fields, vec!["v"]);
    assert_eq!(record.get("missing"), None);
}

#[test]
fn test_record_equality_is_structural() {
    let a = builder("Inner").set("v", 1u32).build().unwrap();
    let b = builder("Inner").set("v", 1u32).build().unwrap();
    let c = builder("Inner").set("v", 2u32).build().unwrap();
    let other = builder("Other").set("w", 1u32).build().unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_ne!(a, other);
}

#[test]
fn test_union_wrap_resolves_tag() {
    let any = schema().union_def("Any").unwrap().clone();
    let inner = builder("Inner").set("v", 1u32).build().unwrap();
    let other = builder("Other").set("w", 1u32).build().unwrap();

    let wrapped = any.wrap(inner).unwrap();
    assert_eq!(wrapped.tag(), 1);
    assert_eq!(wrapped.member(), "Inner");
    assert_eq!(any.wrap(other).unwrap().tag(), 5);

    let outer = builder("Outer").set("id", "x").build().unwrap();
    assert!(matches!(any.wrap(outer), Err(Error::SchemaMismatch { .. })));
}

#[test]
fn test_scalar_vector() {
    let mut v = ScalarVector::with_capacity(ScalarKind::U16, 2);
    assert!(v.is_empty());
    assert!(v.push(Scalar::U16(9)));
    assert!(!v.push(Scalar::U8(1)));
    assert_eq!(v.len(), 1);
    assert_eq!(v.get(0), Some(Scalar::U16(9)));
    assert_eq!(v.kind(), ScalarKind::U16);
    assert_eq!(v.iter().collect::<Vec<_>>(), vec![Scalar::U16(9)]);
}

#[test]
fn test_value_accessors() {
    let v = Value::from(vec!["a".to_string()]);
    assert_eq!(v.as_strings(), Some(&["a".to_string()][..]));
    assert_eq!(v.as_str(), None);
    assert_eq!(v.kind_name(), "string vector");
    assert!(Value::from(None::<u8>).is_none());
    assert_eq!(Value::from(Some(3u8)), Value::Scalar(Scalar::U8(3)));
}
