use super::*;
use crate::errors::Error;
use crate::types::{DefaultValue, EnumDef, ScalarKind, TypeDesc, UnionDef};
use pest::Parser;
use pretty_assertions::assert_eq;

#[test]
fn test_valid_schemas() {
    let examples = [
        "",
        "// only a comment\n",
        "/* block\n comment */ table T {}",
        "include \"common.fbs\"; table T { a: int; }",
        "namespace a.b.c; table T { a: int; }",
        "attribute \"priority\"; table T (priority) { a: int (priority); }",
        "enum Color : ubyte { Red, Green, Blue }",
        "enum Color : ubyte { Red = 1, Green, Blue = 8, }",
        "union Any { A, B = 5, ns.C }",
        "table T { v: [ubyte]; w: [ns.Other]; }",
        "table T { f: float = -1.5e3; g: double = inf; h: int = 0x10; }",
        "table T { b: bool = true; c: Color = Green; }",
        "table T {} root_type T;",
        "table tables { table_id: int; }",
    ];
    for source in examples {
        if let Err(err) = SchemaParser::parse(Rule::main, source) {
            panic!("failed to parse {source:?}: {err}");
        }
    }
}

#[test]
fn test_invalid_schemas() {
    let examples = [
        "table { a: int; }",
        "table T { a int; }",
        "table T { a: int }",
        "table T { grid: [[int]]; }",
        "enum E { A }",
        "union U { A = }",
        "tableT { a: int; }",
    ];
    for source in examples {
        assert!(
            parse_file(source).is_err(),
            "expected {source:?} to be rejected"
        );
    }
}

#[test]
fn test_field_types_follow_optionality_rules() {
    let schema = parse(
        r#"
        enum Color : byte { Red, Green }
        union Any { Common1 }
        table Common1 { id: string; }
        table Everything {
            s: string;
            rs: string (required);
            n: ubyte;
            c: Color;
            t: Common1;
            rt: Common1 (required);
            b: [ubyte];
            b8: [uint8] (required);
            v: [int];
            vs: [string];
            ve: [Color];
            vt: [Common1];
            u: Any;
            ru: Any (required);
        }
        "#,
    )
    .unwrap();

    let def = schema.table("Everything").unwrap();
    let types: Vec<_> = def.fields.iter().map(|f| (f.name.as_str(), f.ty.clone())).collect();
    let opt = TypeDesc::optional;
    assert_eq!(
        types,
        vec![
            ("s", opt(TypeDesc::String)),
            ("rs", TypeDesc::String),
            ("n", TypeDesc::Scalar(ScalarKind::U8)),
            ("c", TypeDesc::enumeration("Color")),
            ("t", opt(TypeDesc::table("Common1"))),
            ("rt", TypeDesc::table("Common1")),
            ("b", opt(TypeDesc::Bytes)),
            ("b8", TypeDesc::Bytes),
            ("v", opt(TypeDesc::list(ScalarKind::I32.into()))),
            ("vs", opt(TypeDesc::list(TypeDesc::String))),
            ("ve", opt(TypeDesc::list(TypeDesc::enumeration("Color")))),
            ("vt", opt(TypeDesc::list(TypeDesc::table("Common1")))),
            ("u", opt(TypeDesc::union("Any"))),
            ("ru", TypeDesc::union("Any")),
        ]
    );
}

#[test]
fn test_defaults() {
    let schema = parse(
        r#"
        enum Color : byte { Red, Green }
        table Defaults {
            a: ubyte = 5;
            b: short = -3;
            c: uint = 0xFF;
            d: double = 2.5;
            e: float = -inf;
            f: bool = true;
            g: Color = Green;
            h: Color = Color.Red;
            i: string = null;
        }
        "#,
    )
    .unwrap();

    let defaults: Vec<_> = schema
        .table("Defaults")
        .unwrap()
        .fields
        .iter()
        .map(|f| f.default.clone())
        .collect();
    assert_eq!(
        defaults,
        vec![
            Some(DefaultValue::Int(5)),
            Some(DefaultValue::Int(-3)),
            Some(DefaultValue::Int(255)),
            Some(DefaultValue::Float(2.5)),
            Some(DefaultValue::Float(f64::NEG_INFINITY)),
            Some(DefaultValue::Bool(true)),
            Some(DefaultValue::Ident("Green".to_string())),
            Some(DefaultValue::Ident("Color.Red".to_string())),
            Some(DefaultValue::Null),
        ]
    );
}

#[test]
fn test_enum_numbering_resets_on_explicit_values() {
    let schema = parse("enum Level : ushort { Low, Mid = 10, High, Max = 2 }").unwrap();
    let expected = EnumDef::new("Level", ScalarKind::U16)
        .member_with_value("Low", 0)
        .member_with_value("Mid", 10)
        .member_with_value("High", 11)
        .member_with_value("Max", 2);
    assert_eq!(schema.enum_def("Level").unwrap().as_ref(), &expected);
}

#[test]
fn test_union_members_resolve_by_local_name() {
    let schema = parse(
        r#"
        table A {}
        table B {}
        union Any { game.A, B = 7 }
        "#,
    )
    .unwrap();
    let expected = UnionDef::new("Any").member("A").member_with_tag("B", 7);
    assert_eq!(schema.union_def("Any").unwrap().as_ref(), &expected);
}

#[test]
fn test_namespace_and_root_type() {
    let schema = parse(
        r#"
        namespace game.items;
        table Sword { damage: int; }
        root_type game.items.Sword;
        "#,
    )
    .unwrap();
    assert_eq!(schema.namespace(), Some("game.items"));
    assert_eq!(schema.root_type(), Some("Sword"));
}

#[test]
fn test_keywords_need_a_word_boundary() {
    let schema = parse(
        r#"
        table tables { enumeration: int; union_tag: ubyte; }
        table
            Next
        { tables: tables; }
        "#,
    )
    .unwrap();
    let tables = schema.table("tables").unwrap();
    let names: Vec<_> = tables.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["enumeration", "union_tag"]);
    assert_eq!(
        schema.table("Next").unwrap().fields[0].ty,
        TypeDesc::optional(TypeDesc::table("tables"))
    );

    assert!(parse_file("tables T {}").is_err());
    assert!(parse_file("enumColor : byte { A }").is_err());
}

#[test]
fn test_duplicate_definitions_are_parse_errors() {
    let err = parse_file("table T {} enum T : byte { A }").unwrap_err();
    assert_eq!(
        err.kind,
        ParseErrorKind::DuplicateDefinition {
            name: "T".to_string()
        }
    );
    assert_eq!(err.span.0.start, 11);

    let err = parse_file("table T { a: int; a: long; }").unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::DuplicateDefinition { ref name } if name == "a"));
}

#[test]
fn test_invalid_number() {
    let err = parse_file("enum E : long { A = 99999999999999999999 }").unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::InvalidNumber { .. }));

    let err = parse_file("union U { A = -1 }").unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::InvalidNumber { .. }));
}

#[test]
fn test_unknown_attribute() {
    let err = parse("table T { a: int (priority); }").unwrap_err();
    match err {
        Error::SchemaMismatch { context, reason } => {
            assert_eq!(context, "T.a");
            assert!(reason.contains("priority"));
        }
        other => panic!("expected SchemaMismatch, got {other:?}"),
    }

    // Builtins and declared attributes are accepted.
    let source = "attribute \"priority\"; table T (priority) { a: int (required, priority); }";
    assert!(parse(source).is_ok());
}

#[test]
fn test_parse_rejects_includes() {
    let err = parse("include \"other.fbs\"; table T {}").unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch { .. }));
}

#[test]
fn test_lower_resolves_across_files() {
    let common = parse_file(
        r#"
        attribute "priority";
        enum Color : ubyte { Red, Green }
        table Common1 { id: string; }
        "#,
    )
    .unwrap();
    let root = parse_file(
        r#"
        include "common.fbs";
        namespace game;
        table Monster { color: Color (priority); friend: Common1; }
        root_type Monster;
        "#,
    )
    .unwrap();
    assert_eq!(root.includes, vec!["common.fbs".to_string()]);

    let schema = lower(&[root, common]).unwrap();
    assert_eq!(schema.namespace(), Some("game"));
    assert_eq!(schema.root_type(), Some("Monster"));
    let monster = schema.table("Monster").unwrap();
    assert_eq!(monster.fields[0].ty, TypeDesc::enumeration("Color"));
    assert_eq!(monster.fields[1].ty, TypeDesc::optional(TypeDesc::table("Common1")));
}

#[test]
fn test_duplicate_across_files_is_schema_error() {
    let a = parse_file("table T {}").unwrap();
    let b = parse_file("table T {}").unwrap();
    assert!(matches!(lower(&[a, b]), Err(Error::SchemaMismatch { .. })));
}

#[test]
fn test_syntax_error_location() {
    let source = "table T { a: int }";
    let err = parse_file(source).unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::UnexpectedToken { .. }));
    // Reported where the `;` is missing, not at the start of the table.
    assert!(err.span.0.start >= "table T { a: int".len());
}
