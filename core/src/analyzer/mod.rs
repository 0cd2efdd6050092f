//! Field classification and table layout.

pub mod analyzer;
pub mod classifier;
pub mod layout;


pub use analyzer::analyze;
pub use classifier::{FieldCategory, classify};
pub use layout::{Buckets, FieldLayout, TableLayout, vtable_offset};
