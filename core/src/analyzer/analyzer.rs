use tracing::debug;

use super::layout::{Buckets, FieldLayout, TableLayout};
use super::classifier::classify;
use crate::errors::{Error, Result};
use crate::types::Schema;

/// Largest slot whose vtable entry still fits in a `u16` offset.
const MAX_SLOT: u16 = (u16::MAX - 4) / 2;

/// Analyze the table called `table` in `schema`.
///
/// Fields are classified in declaration order and numbered from slot 0;
/// a union takes two slots. The result depends only on the field list, so
/// two tables with the same fields get the same layout.
pub fn analyze(schema: &Schema, table: &str) -> Result<TableLayout> {
    let def = schema.table(table).ok_or_else(|| Error::UnknownTable {
        name: table.to_string(),
    })?;

    let mut fields = Vec::with_capacity(def.fields.len());
    let mut buckets = Buckets::default();
    let mut next_slot: u16 = 0;

    for (index, field) in def.fields.iter().enumerate() {
        let category = classify(schema, &def.name, field)?;
        let slot = next_slot;
        let last_slot = slot + category.slot_count() - 1;
        if last_slot > MAX_SLOT {
            return Err(Error::UnsupportedType {
                table: def.name.clone(),
                field: field.name.clone(),
                ty: field.ty.to_string(),
                reason: "the table has too many fields".to_string(),
            });
        }
        next_slot = last_slot + 1;

        buckets.push(index, &category);
        fields.push(FieldLayout {
            index,
            name: field.name.clone(),
            ty: field.ty.clone(),
            slot,
            category,
        });
    }

    debug!(table = %def.name, slots = next_slot, "Analyzed table layout");

    Ok(TableLayout {
        def: def.clone(),
        fields,
        buckets,
        num_slots: next_slot,
    })
}
