//! In-memory records and field values.

mod record;
mod value;
mod vector;

pub use record::{Record, RecordBuilder};
pub use value::{EnumValue, UnionValue, Value};
pub use vector::ScalarVector;

#[cfg(test)]
mod value_test;
