use std::sync::Arc;

use bumpalo::Bump;
use bumpalo::collections::Vec as BumpVec;
use flatbuffers::{FlatBufferBuilder, UnionWIPOffset, WIPOffset};
use hashbrown::{DefaultHashBuilder, HashMap};

use crate::analyzer::{FieldCategory, FieldLayout, TableLayout, vtable_offset};
use crate::codec::{Codec, TablePlan};
use crate::errors::{Error, Result};
use crate::types::{EnumDef, Scalar, ScalarKind};
use crate::values::{EnumValue, Record, ScalarVector, Value};

/// An offset to anything already written to the builder.
pub(crate) type AnyOffset = WIPOffset<UnionWIPOffset>;

/// The encode procedure of one table type.
///
/// Built once from a layout; it fixes the order in which out-of-line
/// payloads are written before the table itself is opened.
#[derive(Debug, Clone)]
pub struct TableEncoder {
    layout: Arc<TableLayout>,
    payload_order: Vec<usize>,
}

impl TableEncoder {
    pub fn new(layout: Arc<TableLayout>) -> Self {
        let b = layout.buckets();
        let payload_order = [
            &b.strings,
            &b.string_vecs,
            &b.bytes,
            &b.scalar_vecs,
            &b.enum_vecs,
            &b.tables,
            &b.table_vecs,
            &b.unions,
        ]
        .into_iter()
        .flatten()
        .copied()
        .collect();
        Self {
            layout,
            payload_order,
        }
    }

    pub fn layout(&self) -> &Arc<TableLayout> {
        &self.layout
    }

    /// Fields with out-of-line payloads, in write order.
    pub fn payload_order(&self) -> &[usize] {
        &self.payload_order
    }
}

/// One slot write, prepared before the table is opened.
#[derive(Clone, Copy)]
enum SlotWrite {
    Scalar { vo: u16, value: Scalar, default: Scalar },
    Offset { vo: u16, offset: AnyOffset },
    Tag { vo: u16, tag: u8 },
}

/// State of one encode call.
///
/// Strings are interned by content; tables and byte blobs by pointer
/// identity. Both caches live in the call's arena and die with it.
pub(crate) struct Encoder<'r, 'a, 'fbb> {
    codec: &'a Codec,
    builder: &'a mut FlatBufferBuilder<'fbb>,
    arena: &'a Bump,
    strings: HashMap<&'r str, u32, DefaultHashBuilder, &'a Bump>,
    objects: HashMap<usize, u32, DefaultHashBuilder, &'a Bump>,
    depths: HashMap<usize, usize, DefaultHashBuilder, &'a Bump>,
}

impl<'r, 'a, 'fbb> Encoder<'r, 'a, 'fbb> {
    pub(crate) fn new(
        codec: &'a Codec,
        builder: &'a mut FlatBufferBuilder<'fbb>,
        arena: &'a Bump,
    ) -> Self {
        Self {
            codec,
            builder,
            arena,
            strings: HashMap::new_in(arena),
            objects: HashMap::new_in(arena),
            depths: HashMap::new_in(arena),
        }
    }

    /// Write `record` and everything it references. Returns the offset of
    /// its table.
    pub(crate) fn encode_root(&mut self, record: &'r Record) -> Result<AnyOffset> {
        let plan = self.codec.plan(record.table_name())?;
        self.check_depth(plan.layout(), record)?;
        self.encode_record(&plan, record)
    }

    /// Fail before anything is written if `record` nests more tables than
    /// `max_depth` allows, the same bound the decoder enforces.
    fn check_depth(&mut self, layout: &TableLayout, record: &Record) -> Result<()> {
        let max_depth = self.codec.options().max_depth;
        let Some(below) = max_depth.checked_sub(1) else {
            return Err(Error::mismatch(
                layout.name(),
                "a max_depth of 0 leaves no room for the root table",
            ));
        };
        for (field, value) in layout.fields().iter().zip(record.values()) {
            for child in children(value) {
                if self.depth(child, below).is_none() {
                    return Err(Error::ValueMismatch {
                        table: layout.name().to_string(),
                        field: field.name.clone(),
                        expected: format!("at most {max_depth} levels of nested tables"),
                    });
                }
            }
        }
        Ok(())
    }

    /// Levels of tables in `record`, itself included, or `None` past `limit`.
    fn depth(&mut self, record: &Arc<Record>, limit: usize) -> Option<usize> {
        let key = Arc::as_ptr(record) as usize;
        let depth = match self.depths.get(&key) {
            Some(&depth) => depth,
            None => {
                if limit == 0 {
                    return None;
                }
                let mut below = 0;
                for child in record.values().iter().flat_map(children) {
                    below = below.max(self.depth(child, limit - 1)?);
                }
                self.depths.insert(key, below + 1);
                below + 1
            }
        };
        (depth <= limit).then_some(depth)
    }

    fn encode_record(&mut self, plan: &TablePlan, record: &'r Record) -> Result<AnyOffset> {
        let layout = plan.layout();
        let values = record.values();
        if record.table_name() != layout.name() || values.len() != layout.fields().len() {
            return Err(Error::mismatch(
                layout.name(),
                format!(
                    "cannot encode a `{}` record with {} values",
                    record.table_name(),
                    values.len()
                ),
            ));
        }

        let arena = self.arena;
        let mut offsets = bumpalo::vec![in arena; None::<AnyOffset>; values.len()];
        for &index in plan.encoder().payload_order() {
            let field = &layout.fields()[index];
            offsets[index] = self.payload(layout, field, &values[index])?;
        }

        let mut writes = BumpVec::with_capacity_in(layout.num_slots() as usize, arena);
        for field in layout.fields() {
            let (value, offset) = (&values[field.index], offsets[field.index]);
            self.prepare_slot(layout, field, value, offset, &mut writes)?;
        }

        let start = self.builder.start_table();
        for write in writes.iter() {
            match *write {
                SlotWrite::Scalar { vo, value, default } => {
                    push_scalar(self.builder, vo, value, default);
                }
                SlotWrite::Offset { vo, offset } => self.builder.push_slot_always(vo, offset),
                SlotWrite::Tag { vo, tag } => self.builder.push_slot::<u8>(vo, tag, 0),
            }
        }
        Ok(self.builder.end_table(start).as_union_value())
    }

    /// Write the out-of-line payload of one field.
    fn payload(
        &mut self,
        layout: &TableLayout,
        field: &FieldLayout,
        value: &'r Value,
    ) -> Result<Option<AnyOffset>> {
        let offset = match (&field.category, value) {
            (category, Value::None) if category.is_optional() => return Ok(None),
            (FieldCategory::StringRef { .. }, Value::Str(s)) => self.intern(s),
            (FieldCategory::StringVec { .. }, Value::Strings(items)) => {
                let mut elems = BumpVec::with_capacity_in(items.len(), self.arena);
                for s in items {
                    elems.push(self.intern(s));
                }
                self.builder.create_vector(&elems[..]).as_union_value()
            }
            (FieldCategory::BytesRef { .. }, Value::Bytes(data)) => {
                let key = Arc::as_ptr(data) as *const u8 as usize;
                match self.objects.get(&key) {
                    Some(&raw) => WIPOffset::new(raw),
                    None => {
                        let offset = self.builder.create_vector(&data[..]).as_union_value();
                        self.objects.insert(key, offset.value());
                        offset
                    }
                }
            }
            (FieldCategory::ScalarVec { kind, .. }, Value::Scalars(items))
                if items.kind() == *kind =>
            {
                self.scalar_vector(items)
            }
            (FieldCategory::EnumVec { def, kind, .. }, Value::Enums(items)) => {
                let mut raw = ScalarVector::with_capacity(*kind, items.len());
                for item in items {
                    let scalar = enum_raw(def, *kind, item)
                        .ok_or_else(|| value_mismatch(layout, field, value))?;
                    raw.push(scalar);
                }
                self.scalar_vector(&raw)
            }
            (FieldCategory::TableRef { table, .. }, Value::Table(record)) => {
                self.table_offset(layout, field, table, record)?
            }
            (FieldCategory::TableVec { table, .. }, Value::Tables(records)) => {
                let mut elems = BumpVec::with_capacity_in(records.len(), self.arena);
                for record in records {
                    elems.push(self.table_offset(layout, field, table, record)?);
                }
                self.builder.create_vector(&elems[..]).as_union_value()
            }
            (FieldCategory::Union { mapping, .. }, Value::Union(union)) => {
                let member = mapping
                    .member(union.tag())
                    .filter(|member| member.as_ref() == union.member())
                    .ok_or_else(|| value_mismatch(layout, field, value))?
                    .clone();
                self.table_offset(layout, field, &member, union.record())?
            }
            _ => return Err(value_mismatch(layout, field, value)),
        };
        Ok(Some(offset))
    }

    fn prepare_slot(
        &self,
        layout: &TableLayout,
        field: &FieldLayout,
        value: &Value,
        offset: Option<AnyOffset>,
        writes: &mut BumpVec<'_, SlotWrite>,
    ) -> Result<()> {
        let vo = field.vtable_offset();
        match (&field.category, value) {
            (FieldCategory::Inline { kind, default }, Value::Scalar(s)) if s.kind() == *kind => {
                writes.push(SlotWrite::Scalar {
                    vo,
                    value: *s,
                    default: *default,
                });
            }
            (FieldCategory::Inline { .. }, _) => return Err(value_mismatch(layout, field, value)),
            (FieldCategory::EnumInline { def, kind, default }, Value::Enum(e)) => {
                let mismatch = || value_mismatch(layout, field, value);
                writes.push(SlotWrite::Scalar {
                    vo,
                    value: enum_raw(def, *kind, e).ok_or_else(mismatch)?,
                    default: enum_raw(def, *kind, default).ok_or_else(mismatch)?,
                });
            }
            (FieldCategory::EnumInline { .. }, _) => {
                return Err(value_mismatch(layout, field, value));
            }
            (FieldCategory::Union { .. }, _) => {
                let tag = value.as_union().map_or(0, |u| u.tag());
                writes.push(SlotWrite::Tag { vo, tag });
                if let Some(offset) = offset {
                    writes.push(SlotWrite::Offset {
                        vo: vtable_offset(field.slot + 1),
                        offset,
                    });
                }
            }
            (_, _) => {
                if let Some(offset) = offset {
                    writes.push(SlotWrite::Offset { vo, offset });
                }
            }
        }
        Ok(())
    }

    fn intern(&mut self, s: &'r str) -> AnyOffset {
        if let Some(&raw) = self.strings.get(s) {
            return WIPOffset::new(raw);
        }
        let offset = self.builder.create_string(s).as_union_value();
        self.strings.insert(s, offset.value());
        offset
    }

    fn table_offset(
        &mut self,
        layout: &TableLayout,
        field: &FieldLayout,
        expected: &str,
        record: &'r Arc<Record>,
    ) -> Result<AnyOffset> {
        if record.table_name() != expected {
            return Err(Error::ValueMismatch {
                table: layout.name().to_string(),
                field: field.name.clone(),
                expected: format!("a `{expected}` table, got `{}`", record.table_name()),
            });
        }
        let key = Arc::as_ptr(record) as usize;
        if let Some(&raw) = self.objects.get(&key) {
            return Ok(WIPOffset::new(raw));
        }
        let plan = self.codec.plan(expected)?;
        let offset = self.encode_record(&plan, record)?;
        self.objects.insert(key, offset.value());
        Ok(offset)
    }

    fn scalar_vector(&mut self, items: &ScalarVector) -> AnyOffset {
        let b = &mut *self.builder;
        match items {
            ScalarVector::Bool(v) => b.create_vector(v.as_slice()).as_union_value(),
            ScalarVector::U8(v) => b.create_vector(v.as_slice()).as_union_value(),
            ScalarVector::U16(v) => b.create_vector(v.as_slice()).as_union_value(),
            ScalarVector::U32(v) => b.create_vector(v.as_slice()).as_union_value(),
            ScalarVector::U64(v) => b.create_vector(v.as_slice()).as_union_value(),
            ScalarVector::I8(v) => b.create_vector(v.as_slice()).as_union_value(),
            ScalarVector::I16(v) => b.create_vector(v.as_slice()).as_union_value(),
            ScalarVector::I32(v) => b.create_vector(v.as_slice()).as_union_value(),
            ScalarVector::I64(v) => b.create_vector(v.as_slice()).as_union_value(),
            ScalarVector::F32(v) => b.create_vector(v.as_slice()).as_union_value(),
            ScalarVector::F64(v) => b.create_vector(v.as_slice()).as_union_value(),
        }
    }
}

/// Records a value refers to directly.
fn children(value: &Value) -> &[Arc<Record>] {
    match value {
        Value::Table(record) => std::slice::from_ref(record),
        Value::Tables(records) => records,
        Value::Union(union) => std::slice::from_ref(union.record()),
        _ => &[],
    }
}

/// The raw scalar of an enum member, checked against its definition.
fn enum_raw(def: &EnumDef, kind: ScalarKind, value: &EnumValue) -> Option<Scalar> {
    if def.value_of(value.member()) != Some(value.value()) {
        return None;
    }
    Scalar::from_i128(kind, value.value().into())
}

/// Push `value` unless it equals `default` (and defaults aren't forced).
///
/// Both scalars are of the field's kind; the layout guarantees the default's
/// and `prepare_slot` the value's.
fn push_scalar(builder: &mut FlatBufferBuilder<'_>, vo: u16, value: Scalar, default: Scalar) {
    match (value, default) {
        (Scalar::Bool(v), Scalar::Bool(d)) => builder.push_slot(vo, v, d),
        (Scalar::U8(v), Scalar::U8(d)) => builder.push_slot(vo, v, d),
        (Scalar::U16(v), Scalar::U16(d)) => builder.push_slot(vo, v, d),
        (Scalar::U32(v), Scalar::U32(d)) => builder.push_slot(vo, v, d),
        (Scalar::U64(v), Scalar::U64(d)) => builder.push_slot(vo, v, d),
        (Scalar::I8(v), Scalar::I8(d)) => builder.push_slot(vo, v, d),
        (Scalar::I16(v), Scalar::I16(d)) => builder.push_slot(vo, v, d),
        (Scalar::I32(v), Scalar::I32(d)) => builder.push_slot(vo, v, d),
        (Scalar::I64(v), Scalar::I64(d)) => builder.push_slot(vo, v, d),
        (Scalar::F32(v), Scalar::F32(d)) => builder.push_slot(vo, v, d),
        (Scalar::F64(v), Scalar::F64(d)) => builder.push_slot(vo, v, d),
        _ => debug_assert!(false, "scalar kinds differ at vtable offset {vo}"),
    }
}

fn value_mismatch(layout: &TableLayout, field: &FieldLayout, value: &Value) -> Error {
    Error::ValueMismatch {
        table: layout.name().to_string(),
        field: field.name.clone(),
        expected: format!("{}, got {}", field.category, value.kind_name()),
    }
}
