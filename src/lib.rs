//! flatrecord - Schema-driven FlatBuffers encoding for Rust records
//!
//! # Overview
//!
//! flatrecord turns table declarations into encode and decode procedures
//! for the FlatBuffers wire format. Each table is analyzed once into a slot
//! layout; after that, encoding and decoding only walk the cached layout.
//! Output is byte-compatible with other FlatBuffers implementations.
//!
//! # Quick Start
//!
//! ```
//! use flatrecord::{Codec, parser};
//!
//! let schema = parser::parse(r#"
//!     table Common1 { id: string; count: ubyte; }
//! "#)?;
//! let codec = Codec::new(schema);
//!
//! let record = codec.builder("Common1")?.set("id", "abc").set("count", 5).build()?;
//! let bytes = codec.encode(&record)?;
//! assert_eq!(codec.decode("Common1", &bytes)?, record);
//! # Ok::<(), flatrecord::CodecError>(())
//! ```
//!
//! # Schemas on disk
//!
//! [`load_schema`] reads a `.fbs` file together with everything it
//! includes. Its errors render with source snippets through
//! [`render_error`].
//!
//! # Rust types
//!
//! Structs implementing [`FlatTable`] are encoded with [`encode`] and
//! decoded with [`decode`], through a codec shared by the whole process.

mod error_renderer;
mod loader;

pub use error_renderer::{
    render_error, render_error_to, render_error_to_string, render_error_to_string_no_color,
};
pub use loader::{Error, load_schema};

// Re-export public API from flatrecord_core
pub use flatrecord_core::Error as CodecError;
pub use flatrecord_core::codec::{
    Codec, CodecOptions, FlatTable, FromValue, TablePlan, codec_for, decode, encode,
};
pub use flatrecord_core::parser;
pub use flatrecord_core::types::{self, Schema};
pub use flatrecord_core::values::{self, EnumValue, Record, RecordBuilder, UnionValue, Value};
