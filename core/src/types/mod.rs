//! The declaration model: scalar kinds, field types and named definitions.

mod definitions;
mod descriptor;
mod scalar;
mod schema;

pub use definitions::{EnumDef, EnumMember, TableDef, UnionDef, UnionMapping, UnionMember};
pub use descriptor::{DefaultValue, FieldDecl, TypeDesc};
pub use scalar::{Scalar, ScalarKind};
pub(crate) use scalar::with_scalar_type;
pub use schema::{DefinitionKind, Schema};
