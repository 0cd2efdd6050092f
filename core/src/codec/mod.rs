//! The top-level codec: cached per-table plans over one schema.

#[allow(clippy::module_inception)]
mod codec;
mod options;
mod typed;

pub use codec::{Codec, TablePlan};
pub use options::CodecOptions;
pub use typed::{FlatTable, FromValue, codec_for, decode, encode};
