//! Reads records back out of finished buffers.

mod decoder;
pub mod reader;

pub use decoder::TableDecoder;
pub(crate) use decoder::Decoder;
pub use reader::TableReader;
