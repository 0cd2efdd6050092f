//! Linearizes records into FlatBuffers tables.

mod encoder;

pub use encoder::TableEncoder;
pub(crate) use encoder::Encoder;
