use std::sync::Arc;

use flatbuffers::{
    Follow, ForwardsUOffset, InvalidFlatbuffer, Table, TableVerifier, Vector, Verifiable, Verifier,
    VerifierOptions,
};

use super::reader;
use crate::analyzer::{FieldCategory, FieldLayout, TableLayout, vtable_offset};
use crate::codec::Codec;
use crate::errors::{Error, Result};
use crate::types::{EnumDef, Scalar, ScalarKind, with_scalar_type};
use crate::values::{EnumValue, Record, ScalarVector, UnionValue, Value};

/// The decode procedure of one table type.
#[derive(Debug, Clone)]
pub struct TableDecoder {
    layout: Arc<TableLayout>,
}

impl TableDecoder {
    pub fn new(layout: Arc<TableLayout>) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &Arc<TableLayout> {
        &self.layout
    }
}

/// State of one decode call.
///
/// Decoding runs in two passes. The first walks the buffer with a
/// [`Verifier`], following exactly the slots the plans will read. The
/// second reads those slots through [`Table`] and builds the record.
pub(crate) struct Decoder<'b, 'a> {
    codec: &'a Codec,
    buf: &'b [u8],
}

impl<'b, 'a> Decoder<'b, 'a> {
    pub(crate) fn new(codec: &'a Codec, buf: &'b [u8]) -> Self {
        Self { codec, buf }
    }

    /// Decode the root table of the buffer as a `table`.
    pub(crate) fn decode_root(&self, table: &str) -> Result<Record> {
        let opts = VerifierOptions {
            max_depth: self.codec.options().max_depth,
            ..VerifierOptions::default()
        };
        let mut verifier = Verifier::new(&opts, self.buf);
        let root = verifier.get_uoffset(0).map_err(reader::invalid)? as usize;
        self.verify_table(&mut verifier, table, root)?;

        // SAFETY: `verify_table` checked the vtable at `root`.
        let root = unsafe { Table::new(self.buf, root) };
        self.decode_table(table, root)
    }

    fn invalid(&self, err: InvalidFlatbuffer, context: impl FnOnce() -> String) -> Error {
        match err {
            InvalidFlatbuffer::DepthLimitReached => Error::malformed(format!(
                "tables nest deeper than {} levels",
                self.codec.options().max_depth
            )),
            err => Error::malformed(format!("{}: {}", context(), reader::headline(&err))),
        }
    }

    fn verify_table(&self, verifier: &mut Verifier<'_, 'b>, table: &str, pos: usize) -> Result<()> {
        let plan = self.codec.plan(table)?;
        let layout = plan.decoder().layout();

        let mut tv = verifier
            .visit_table(pos)
            .map_err(|err| self.invalid(err, || format!("table `{table}` at {pos}")))?;
        for field in layout.fields() {
            tv = self.verify_field(tv, layout, field)?;
        }
        tv.finish();
        Ok(())
    }

    fn verify_field<'v, 'o>(
        &self,
        tv: TableVerifier<'v, 'o, 'b>,
        layout: &TableLayout,
        field: &FieldLayout,
    ) -> Result<TableVerifier<'v, 'o, 'b>> {
        let vo = field.vtable_offset();
        let bad = |err: InvalidFlatbuffer| {
            self.invalid(err, || format!("field `{}.{}`", layout.name(), field.name))
        };

        match &field.category {
            FieldCategory::Inline { kind, .. } | FieldCategory::EnumInline { kind, .. } => {
                with_scalar_type!(*kind, T => visit::<T>(tv, vo)).map_err(bad)
            }
            FieldCategory::StringRef { .. } => visit::<ForwardsUOffset<&str>>(tv, vo).map_err(bad),
            FieldCategory::BytesRef { .. } => {
                visit::<ForwardsUOffset<Vector<'_, u8>>>(tv, vo).map_err(bad)
            }
            FieldCategory::StringVec { .. } => {
                visit::<ForwardsUOffset<Vector<'_, ForwardsUOffset<&str>>>>(tv, vo).map_err(bad)
            }
            FieldCategory::ScalarVec { kind, .. } | FieldCategory::EnumVec { kind, .. } => {
                with_scalar_type!(*kind, T => visit::<ForwardsUOffset<Vector<'_, T>>>(tv, vo))
                    .map_err(bad)
            }
            FieldCategory::TableRef { table, .. } => {
                let mut tv = tv;
                if let Some(pos) = follow(&mut tv, vo).map_err(&bad)? {
                    self.verify_table(tv.verifier(), table, pos)?;
                }
                Ok(tv)
            }
            FieldCategory::TableVec { table, .. } => {
                let mut tv = tv;
                if let Some(pos) = follow(&mut tv, vo).map_err(&bad)? {
                    let verifier = tv.verifier();
                    <Vector<'_, u32>>::run_verifier(verifier, pos).map_err(&bad)?;
                    let len = verifier.get_uoffset(pos).map_err(&bad)? as usize;
                    for i in 0..len {
                        let slot = pos + 4 * (i + 1);
                        let offset = verifier.get_uoffset(slot).map_err(&bad)? as usize;
                        self.verify_table(verifier, table, slot.saturating_add(offset))?;
                    }
                }
                Ok(tv)
            }
            // The value is only followed when the tag names a member. A zero
            // tag with no value is what `force_defaults` writes for an unset
            // union, so this does not go through `visit_union`.
            FieldCategory::Union { mapping, .. } => {
                let mut tv = visit::<u8>(tv, vo).map_err(&bad)?;
                let tag = match tv.deref(vo).map_err(&bad)? {
                    Some(pos) => tv.verifier().get_u8(pos).map_err(&bad)?,
                    None => 0,
                };
                if let Some(member) = mapping.member(tag) {
                    let value = vtable_offset(field.slot + 1);
                    if let Some(pos) = follow(&mut tv, value).map_err(&bad)? {
                        self.verify_table(tv.verifier(), member, pos)?;
                    }
                }
                Ok(tv)
            }
        }
    }

    fn decode_table(&self, table: &str, at: Table<'b>) -> Result<Record> {
        let plan = self.codec.plan(table)?;
        let layout = plan.decoder().layout();

        let values = layout
            .fields()
            .iter()
            .map(|field| self.field(layout, field, at))
            .collect::<Result<Vec<_>>>()?;
        Record::new(layout.def().clone(), values)
    }

    fn child(&self, table: &str, at: Table<'b>) -> Result<Arc<Record>> {
        self.decode_table(table, at).map(Arc::new)
    }

    fn field(&self, layout: &TableLayout, field: &FieldLayout, at: Table<'b>) -> Result<Value> {
        let vo = field.vtable_offset();
        let missing = || {
            Error::malformed(format!(
                "required field `{}.{}` is missing",
                layout.name(),
                field.name
            ))
        };

        let value = match &field.category {
            FieldCategory::Inline { kind, default } => {
                Value::Scalar(scalar(at, vo, *kind).unwrap_or(*default))
            }
            FieldCategory::EnumInline { def, kind, default } => match scalar(at, vo, *kind) {
                Some(raw) => Value::Enum(enum_member(def, raw.as_i128())?),
                None => Value::Enum(default.clone()),
            },
            FieldCategory::StringRef { optional } => {
                match read::<ForwardsUOffset<&'b str>>(at, vo) {
                    Some(s) => Value::Str(s.to_string()),
                    None if *optional => Value::None,
                    None => return Err(missing()),
                }
            }
            FieldCategory::BytesRef { optional } => {
                match read::<ForwardsUOffset<Vector<'b, u8>>>(at, vo) {
                    Some(bytes) => Value::Bytes(Arc::from(bytes.bytes())),
                    None if *optional => Value::None,
                    None => return Err(missing()),
                }
            }
            FieldCategory::TableRef { table, optional } => {
                match read::<ForwardsUOffset<Table<'b>>>(at, vo) {
                    Some(child) => Value::Table(self.child(table, child)?),
                    None if *optional => Value::None,
                    None => return Err(missing()),
                }
            }
            // Absent required vectors read as empty.
            FieldCategory::StringVec { optional } => {
                match read::<ForwardsUOffset<Vector<'b, ForwardsUOffset<&'b str>>>>(at, vo) {
                    Some(items) => Value::Strings(items.iter().map(str::to_string).collect()),
                    None if *optional => Value::None,
                    None => Value::Strings(Vec::new()),
                }
            }
            FieldCategory::ScalarVec { kind, optional } => match scalars(at, vo, *kind) {
                Some(items) => Value::Scalars(items),
                None if *optional => Value::None,
                None => Value::Scalars(ScalarVector::with_capacity(*kind, 0)),
            },
            FieldCategory::EnumVec {
                def,
                kind,
                optional,
            } => match scalars(at, vo, *kind) {
                Some(raw) => {
                    let members = raw
                        .iter()
                        .map(|s| enum_member(def, s.as_i128()))
                        .collect::<Result<Vec<_>>>()?;
                    Value::Enums(members)
                }
                None if *optional => Value::None,
                None => Value::Enums(Vec::new()),
            },
            FieldCategory::TableVec { table, optional } => {
                match read::<ForwardsUOffset<Vector<'b, ForwardsUOffset<Table<'b>>>>>(at, vo) {
                    Some(items) => Value::Tables(
                        items
                            .iter()
                            .map(|child| self.child(table, child))
                            .collect::<Result<Vec<_>>>()?,
                    ),
                    None if *optional => Value::None,
                    None => Value::Tables(Vec::new()),
                }
            }
            FieldCategory::Union {
                def,
                mapping,
                nullable,
            } => {
                let tag = read::<u8>(at, vo).unwrap_or(0);
                if tag == 0 {
                    if *nullable {
                        return Ok(Value::None);
                    }
                    return Err(missing());
                }
                let member = mapping.member(tag).ok_or_else(|| {
                    Error::malformed(format!(
                        "discriminant {tag} is not a member of union `{}`",
                        def.name
                    ))
                })?;
                let value = read::<ForwardsUOffset<Table<'b>>>(at, vtable_offset(field.slot + 1))
                    .ok_or_else(missing)?;
                Value::Union(UnionValue::new(tag, self.child(member, value)?))
            }
        };
        Ok(value)
    }
}

fn visit<'v, 'o, 'b, T: Verifiable>(
    tv: TableVerifier<'v, 'o, 'b>,
    vo: u16,
) -> Result<TableVerifier<'v, 'o, 'b>, InvalidFlatbuffer> {
    tv.visit_field::<T>("", vo, false)
}

/// Target of the uoffset stored in the slot at `vo`, if the slot is present.
fn follow(tv: &mut TableVerifier<'_, '_, '_>, vo: u16) -> Result<Option<usize>, InvalidFlatbuffer> {
    let Some(pos) = tv.deref(vo)? else {
        return Ok(None);
    };
    let offset = tv.verifier().get_uoffset(pos)? as usize;
    Ok(Some(pos.saturating_add(offset)))
}

fn read<'b, T: Follow<'b> + 'b>(at: Table<'b>, vo: u16) -> Option<T::Inner> {
    // SAFETY: `verify_field` checked every slot the decoder reads, as the
    // same type, against the same plan.
    unsafe { at.get::<T>(vo, None) }
}

fn scalar(at: Table<'_>, vo: u16, kind: ScalarKind) -> Option<Scalar> {
    with_scalar_type!(kind, T => read::<T>(at, vo).map(Scalar::from))
}

fn scalars<'b>(at: Table<'b>, vo: u16, kind: ScalarKind) -> Option<ScalarVector> {
    with_scalar_type!(kind, T => {
        read::<ForwardsUOffset<Vector<'b, T>>>(at, vo)
            .map(|items| ScalarVector::from(items.iter().collect::<Vec<T>>()))
    })
}

fn enum_member(def: &EnumDef, raw: Option<i128>) -> Result<EnumValue> {
    raw.and_then(|v| i64::try_from(v).ok())
        .and_then(|v| def.from_raw(v))
        .ok_or_else(|| {
            Error::malformed(format!(
                "{} is not a value of enum `{}`",
                raw.map_or_else(|| "?".to_string(), |v| v.to_string()),
                def.name
            ))
        })
}
