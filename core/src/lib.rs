//! Schema-driven encoding of records into FlatBuffers tables.
//!
//! A [`Schema`](types::Schema) declares tables, enums and unions, either
//! parsed from `.fbs` source by [`parser`] or built directly. A
//! [`Codec`](codec::Codec) analyzes each table once into a slot layout and
//! then encodes [`Record`](values::Record)s to bytes and decodes them back,
//! bit-exact with other FlatBuffers implementations.

pub mod analyzer;
pub mod codec;
pub mod decoder;
pub mod encoder;
pub mod errors;
pub mod parser;
pub mod types;
pub mod values;

pub use codec::{Codec, CodecOptions, FlatTable, FromValue, TablePlan};
pub use errors::{Error, Result};
pub use values::{EnumValue, Record, RecordBuilder, UnionValue, Value};
