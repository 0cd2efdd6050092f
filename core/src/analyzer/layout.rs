use core::fmt;
use std::sync::Arc;

use super::FieldCategory;
use crate::types::{TableDef, TypeDesc};

/// Byte offset, within a vtable, of the entry for `slot`.
///
/// Fixed by the wire format: a 4-byte header, then 2 bytes per slot.
pub const fn vtable_offset(slot: u16) -> u16 {
    4 + 2 * slot
}

/// One analyzed field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldLayout {
    /// Position in declaration order.
    pub index: usize,
    pub name: String,
    pub ty: TypeDesc,
    /// First vtable slot. Unions also use `slot + 1` for their offset.
    pub slot: u16,
    pub category: FieldCategory,
}

impl FieldLayout {
    pub fn vtable_offset(&self) -> u16 {
        vtable_offset(self.slot)
    }
}

/// Field indices grouped by category, each in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buckets {
    pub inlines: Vec<usize>,
    pub enums: Vec<usize>,
    pub strings: Vec<usize>,
    pub bytes: Vec<usize>,
    pub tables: Vec<usize>,
    pub string_vecs: Vec<usize>,
    pub scalar_vecs: Vec<usize>,
    pub enum_vecs: Vec<usize>,
    pub table_vecs: Vec<usize>,
    pub unions: Vec<usize>,
}

impl Buckets {
    pub(super) fn push(&mut self, index: usize, category: &FieldCategory) {
        let bucket = match category {
            FieldCategory::Inline { .. } => &mut self.inlines,
            FieldCategory::EnumInline { .. } => &mut self.enums,
            FieldCategory::StringRef { .. } => &mut self.strings,
            FieldCategory::BytesRef { .. } => &mut self.bytes,
            FieldCategory::TableRef { .. } => &mut self.tables,
            FieldCategory::StringVec { .. } => &mut self.string_vecs,
            FieldCategory::ScalarVec { .. } => &mut self.scalar_vecs,
            FieldCategory::EnumVec { .. } => &mut self.enum_vecs,
            FieldCategory::TableVec { .. } => &mut self.table_vecs,
            FieldCategory::Union { .. } => &mut self.unions,
        };
        bucket.push(index);
    }
}

/// The analyzed layout of one table type. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub(super) def: Arc<TableDef>,
    pub(super) fields: Vec<FieldLayout>,
    pub(super) buckets: Buckets,
    pub(super) num_slots: u16,
}

impl TableLayout {
    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn def(&self) -> &Arc<TableDef> {
        &self.def
    }

    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn buckets(&self) -> &Buckets {
        &self.buckets
    }

    /// Total vtable slots, with unions counted twice.
    pub fn num_slots(&self) -> u16 {
        self.num_slots
    }

    /// Tables this layout refers to, directly or as union members.
    pub fn referenced_tables(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().flat_map(|f| -> Vec<&str> {
            match &f.category {
                FieldCategory::TableRef { table, .. } | FieldCategory::TableVec { table, .. } => {
                    vec![table.as_ref()]
                }
                FieldCategory::Union { mapping, .. } => mapping.iter().map(|(_, t)| t).collect(),
                _ => Vec::new(),
            }
        })
    }
}

/// A slot table:
///
/// ```text
/// table Common1 (2 slots)
///   slot  vt  field  layout
///      0   4  id     string
///      1   6  count  inline ubyte = 0
/// ```
impl fmt::Display for TableLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "table {} ({} slots)", self.def.name, self.num_slots)?;
        let width = self
            .fields
            .iter()
            .map(|field| field.name.len())
            .max()
            .unwrap_or(0)
            .max("field".len());
        writeln!(f, "  slot  vt  {:width$}  layout", "field")?;
        for field in &self.fields {
            writeln!(
                f,
                "  {:>4}  {:>2}  {:width$}  {}",
                field.slot,
                field.vtable_offset(),
                field.name,
                field.category
            )?;
        }
        Ok(())
    }
}
