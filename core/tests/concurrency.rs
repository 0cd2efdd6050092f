//! Many threads sharing one codec.

use std::sync::{Arc, Barrier};
use std::thread;

use flatrecord_core::codec::{self, FlatTable};
use flatrecord_core::types::{ScalarKind, Schema, TableDef, TypeDesc};
use flatrecord_core::{Codec, Record, Result, parser};
use pretty_assertions::assert_eq;

const THREADS: usize = 8;

const SCHEMA: &str = r#"
    table Leaf { id: string; n: uint; }
    table Branch { name: string; leaves: [Leaf]; weights: [double]; }
"#;

#[test]
fn test_first_use_race_publishes_one_plan() {
    let codec = Arc::new(Codec::new(parser::parse(SCHEMA).unwrap()));
    let barrier = Arc::new(Barrier::new(THREADS));

    let plans: Vec<_> = (0..THREADS)
        .map(|_| {
            let codec = codec.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                codec.plan("Branch").unwrap()
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    for plan in &plans[1..] {
        assert!(Arc::ptr_eq(plan, &plans[0]));
    }
    // Leaf was published along with Branch.
    let leaf = codec.plan("Leaf").unwrap();
    assert!(Arc::ptr_eq(&leaf, &codec.plan("Leaf").unwrap()));
}

#[test]
fn test_parallel_encode_and_decode() {
    let codec = Arc::new(Codec::new(parser::parse(SCHEMA).unwrap()));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let codec = codec.clone();
            thread::spawn(move || {
                for i in 0..100u32 {
                    let leaves: Vec<Record> = (0..i % 5)
                        .map(|j| {
                            codec
                                .builder("Leaf")
                                .unwrap()
                                .set("id", format!("{t}-{i}-{j}"))
                                .set("n", j)
                                .build()
                                .unwrap()
                        })
                        .collect();
                    let branch = codec
                        .builder("Branch")
                        .unwrap()
                        .set("name", format!("branch {t}"))
                        .set("leaves", flatrecord_core::Value::tables(leaves))
                        .set("weights", vec![f64::from(i); (i % 3) as usize])
                        .build()
                        .unwrap();
                    let bytes = codec.encode(&branch).unwrap();
                    assert_eq!(codec.decode("Branch", &bytes).unwrap(), branch);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Reading {
    sensor: String,
    value: f32,
}

impl FlatTable for Reading {
    const TABLE: &'static str = "Reading";

    fn schema() -> Schema {
        Schema::new().with_table(
            TableDef::new("Reading")
                .field("sensor", TypeDesc::String)
                .field("value", ScalarKind::F32),
        )
    }

    fn to_record(&self, codec: &Codec) -> Result<Record> {
        codec
            .builder(Self::TABLE)?
            .set("sensor", self.sensor.as_str())
            .set("value", self.value)
            .build()
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            sensor: record.field("sensor")?,
            value: record.field("value")?,
        })
    }
}

#[test]
fn test_typed_registry_from_many_threads() {
    let barrier = Arc::new(Barrier::new(THREADS));
    let codecs: Vec<_> = (0..THREADS)
        .map(|t| {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let reading = Reading {
                    sensor: format!("s{t}"),
                    value: t as f32 / 2.0,
                };
                let bytes = codec::encode(&reading).unwrap();
                assert_eq!(codec::decode::<Reading>(&bytes).unwrap(), reading);
                codec::codec_for::<Reading>().unwrap()
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    for codec in &codecs[1..] {
        assert!(Arc::ptr_eq(codec, &codecs[0]));
    }
}
