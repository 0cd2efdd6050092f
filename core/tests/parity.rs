//! Byte-for-byte parity between codecs built from different schema sources,
//! and with buffers assembled directly through `FlatBufferBuilder`.

use flatbuffers::{FlatBufferBuilder, TableFinishedWIPOffset, WIPOffset};
use flatrecord_core::types::{
    DefaultValue, EnumDef, ScalarKind, Schema, TableDef, TypeDesc, UnionDef,
};
use flatrecord_core::{Codec, Record, Value, parser};
use pretty_assertions::assert_eq;

const MONSTER_FBS: &str = r#"
    // A cut-down monster schema.
    namespace game;

    enum Color : byte { Red, Green, Blue = 2 }

    table Weapon {
        name: string;
        damage: short;
    }

    union Equipment { Weapon }

    table Monster {
        hp: short = 100;
        name: string;
        inventory: [ubyte];
        color: Color = Blue;
        weapons: [Weapon];
        equipped: Equipment;
        path: [float];
    }

    root_type Monster;
"#;

fn declared_schema() -> Schema {
    Schema::new()
        .with_enum(
            EnumDef::new("Color", ScalarKind::I8)
                .member("Red")
                .member("Green")
                .member_with_value("Blue", 2),
        )
        .with_table(
            TableDef::new("Weapon")
                .field("name", TypeDesc::optional(TypeDesc::String))
                .field("damage", ScalarKind::I16),
        )
        .with_union(UnionDef::new("Equipment").member("Weapon"))
        .with_table(
            TableDef::new("Monster")
                .field_with_default("hp", ScalarKind::I16, DefaultValue::Int(100))
                .field("name", TypeDesc::optional(TypeDesc::String))
                .field("inventory", TypeDesc::optional(TypeDesc::Bytes))
                .field_with_default(
                    "color",
                    TypeDesc::enumeration("Color"),
                    DefaultValue::Ident("Blue".to_string()),
                )
                .field(
                    "weapons",
                    TypeDesc::optional(TypeDesc::list(TypeDesc::table("Weapon"))),
                )
                .field("equipped", TypeDesc::optional(TypeDesc::union("Equipment")))
                .field(
                    "path",
                    TypeDesc::optional(TypeDesc::list(ScalarKind::F32.into())),
                ),
        )
        .with_root_type("Monster")
}

fn weapon(codec: &Codec, name: &str, damage: i16) -> Record {
    codec
        .builder("Weapon")
        .unwrap()
        .set("name", name)
        .set("damage", damage)
        .build()
        .unwrap()
}

fn monster(codec: &Codec) -> Record {
    let bow = weapon(codec, "Bow", 1);
    let equipped = codec
        .schema()
        .union_def("Equipment")
        .unwrap()
        .wrap(bow)
        .unwrap();
    codec
        .builder("Monster")
        .unwrap()
        .set("hp", 300i16)
        .set("name", "Orc")
        .set("inventory", Value::bytes(vec![0u8, 1, 2]))
        .set("color", "Green")
        .set(
            "weapons",
            Value::tables([weapon(codec, "Sword", 3), weapon(codec, "Axe", 5)]),
        )
        .set("equipped", equipped)
        .set("path", vec![1.0f32, 2.0])
        .build()
        .unwrap()
}

fn build_weapon<'a>(
    fbb: &mut FlatBufferBuilder<'a>,
    name: &str,
    damage: i16,
) -> WIPOffset<TableFinishedWIPOffset> {
    let name = fbb.create_string(name);
    let start = fbb.start_table();
    fbb.push_slot_always(4, name);
    fbb.push_slot::<i16>(6, damage, 0);
    fbb.end_table(start)
}

/// The monster above, written field by field in slot order.
fn build_monster() -> Vec<u8> {
    let mut fbb = FlatBufferBuilder::new();
    let name = fbb.create_string("Orc");
    let inventory = fbb.create_vector(&[0u8, 1, 2]);
    let path = fbb.create_vector(&[1.0f32, 2.0]);
    let sword = build_weapon(&mut fbb, "Sword", 3);
    let axe = build_weapon(&mut fbb, "Axe", 5);
    let weapons = fbb.create_vector(&[sword, axe]);
    let bow = build_weapon(&mut fbb, "Bow", 1);

    let start = fbb.start_table();
    fbb.push_slot::<i16>(4, 300, 100);
    fbb.push_slot_always(6, name);
    fbb.push_slot_always(8, inventory);
    fbb.push_slot::<i8>(10, 1, 2);
    fbb.push_slot_always(12, weapons);
    fbb.push_slot::<u8>(14, 1, 0);
    fbb.push_slot_always(16, bow);
    fbb.push_slot_always(18, path);
    let root = fbb.end_table(start);
    fbb.finish_minimal(root);
    fbb.finished_data().to_vec()
}

#[test]
fn test_parsed_and_declared_layouts_agree() {
    let parsed = Codec::new(parser::parse(MONSTER_FBS).unwrap());
    let declared = Codec::new(declared_schema());
    for table in ["Weapon", "Monster"] {
        let a = parsed.layout(table).unwrap();
        let b = declared.layout(table).unwrap();
        assert_eq!(a.num_slots(), b.num_slots(), "{table}");
        assert_eq!(a.buckets(), b.buckets(), "{table}");
        assert_eq!(a.to_string(), b.to_string(), "{table}");
    }
}

#[test]
fn test_parsed_and_declared_encode_identically() {
    let parsed = Codec::new(parser::parse(MONSTER_FBS).unwrap());
    let declared = Codec::new(declared_schema());

    let from_parsed = monster(&parsed);
    let from_declared = monster(&declared);
    let a = parsed.encode(&from_parsed).unwrap();
    let b = declared.encode(&from_declared).unwrap();
    assert_eq!(a, b);

    assert_eq!(
        parsed.decode("Monster", &b).unwrap(),
        declared.decode("Monster", &a).unwrap()
    );
}

#[test]
fn test_matches_builder_written_by_hand() {
    let codec = Codec::new(parser::parse(MONSTER_FBS).unwrap());
    let record = monster(&codec);
    let expected = build_monster();

    assert_eq!(codec.encode(&record).unwrap(), expected);
    assert_eq!(codec.decode_root(&expected).unwrap(), record);
}

#[test]
fn test_two_slot_record_matches_builder() {
    let codec = Codec::new(parser::parse("table Common1 { id: string; count: ubyte; }").unwrap());
    let record = codec
        .builder("Common1")
        .unwrap()
        .set("id", "abc")
        .set("count", 5u8)
        .build()
        .unwrap();

    let mut fbb = FlatBufferBuilder::new();
    let id = fbb.create_string("abc");
    let start = fbb.start_table();
    fbb.push_slot_always(4, id);
    fbb.push_slot::<u8>(6, 5, 0);
    let root = fbb.end_table(start);
    fbb.finish_minimal(root);

    assert_eq!(codec.encode(&record).unwrap(), fbb.finished_data());
}

#[test]
fn test_defaults_omitted_like_generated_code() {
    let codec = Codec::new(parser::parse(MONSTER_FBS).unwrap());
    let record = codec.builder("Monster").unwrap().set("hp", 100i16).build().unwrap();

    let mut fbb = FlatBufferBuilder::new();
    let start = fbb.start_table();
    fbb.push_slot::<i16>(4, 100, 100);
    fbb.push_slot::<i8>(10, 2, 2);
    fbb.push_slot::<u8>(14, 0, 0);
    let root = fbb.end_table(start);
    fbb.finish_minimal(root);

    assert_eq!(codec.encode(&record).unwrap(), fbb.finished_data());
}

#[test]
fn test_hand_written_enum_validates_against_schema() {
    let schema = parser::parse(MONSTER_FBS).unwrap();
    let reference = schema.enum_def("Color").unwrap();

    let subset = EnumDef::new("Color", ScalarKind::I8)
        .member("Red")
        .member_with_value("Blue", 2);
    assert!(subset.validate_against(reference).is_ok());

    let renumbered = EnumDef::new("Color", ScalarKind::I8).member_with_value("Blue", 3);
    assert!(renumbered.validate_against(reference).is_err());
}
