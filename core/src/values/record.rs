use core::fmt;
use std::sync::Arc;

use super::Value;
use crate::analyzer::TableLayout;
use crate::errors::{Error, Result};
use crate::types::TableDef;

/// One value of a table type: its definition and one value per field, in
/// declaration order.
///
/// Equality is structural: two records are equal when they belong to tables
/// of the same name and hold equal values.
#[derive(Debug, Clone)]
pub struct Record {
    def: Arc<TableDef>,
    values: Vec<Value>,
}

impl Record {
    /// Pair a definition with its field values.
    ///
    /// Values are checked against the layout only when the record is
    /// encoded; here only their count is checked.
    pub fn new(def: Arc<TableDef>, values: Vec<Value>) -> Result<Self> {
        if values.len() != def.fields.len() {
            return Err(Error::mismatch(
                &def.name,
                format!(
                    "expected {} field values, got {}",
                    def.fields.len(),
                    values.len()
                ),
            ));
        }
        Ok(Self { def, values })
    }

    pub fn table_name(&self) -> &str {
        &self.def.name
    }

    pub fn def(&self) -> &Arc<TableDef> {
        &self.def
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Value of the field called `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.def.field_index(name).and_then(|i| self.values.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.def
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .zip(self.values.iter())
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.def.name == other.def.name && self.values == other.values
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.def.name)?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, " {name}: {value}")?;
        }
        f.write_str(" }")
    }
}

/// Builds a [`Record`] field by field, filling the rest from defaults.
///
/// Inline scalars and enums fall back to their declared (or zero) default,
/// optional fields and nullable unions to [`Value::None`], and required
/// vectors to empty. Any other field left unset is a [`Error::MissingField`].
///
/// Integer and float values are converted to the field's scalar kind when
/// they fit, so `set("count", 5)` works for a `ubyte` field.
///
/// # Example
///
/// ```
/// use flatrecord_core::codec::Codec;
/// use flatrecord_core::types::{ScalarKind, Schema, TableDef, TypeDesc};
///
/// let codec = Codec::new(Schema::new().with_table(
///     TableDef::new("Common1")
///         .field("id", TypeDesc::String)
///         .field("count", ScalarKind::U8),
/// ));
/// let record = codec.builder("Common1")?.set("id", "abc").build()?;
/// assert_eq!(record.get("count").and_then(|v| v.as_scalar()).map(|s| s.to_string()),
///            Some("0".to_string()));
/// # Ok::<(), flatrecord_core::Error>(())
/// ```
#[derive(Debug)]
pub struct RecordBuilder {
    layout: Arc<TableLayout>,
    values: Vec<Option<Value>>,
    error: Option<Error>,
}

impl RecordBuilder {
    pub fn new(layout: Arc<TableLayout>) -> Self {
        let values = vec![None; layout.fields().len()];
        Self {
            layout,
            values,
            error: None,
        }
    }

    /// Set a field. An unknown name is reported by [`build`](Self::build).
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.layout.field_index(name) {
            Some(index) => {
                let value = self.layout.fields()[index].category.coerce(value.into());
                self.values[index] = Some(value);
            }
            None => {
                self.error = Some(Error::mismatch(
                    self.layout.name(),
                    format!("no field named `{name}`"),
                ));
            }
        }
        self
    }

    pub fn build(self) -> Result<Record> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut values = Vec::with_capacity(self.values.len());
        for (field, value) in self.layout.fields().iter().zip(self.values) {
            let value = match value {
                Some(value) => value,
                None => field
                    .category
                    .default_value()
                    .ok_or_else(|| Error::MissingField {
                        table: self.layout.name().to_string(),
                        field: field.name.clone(),
                    })?,
            };
            values.push(value);
        }
        Record::new(self.layout.def().clone(), values)
    }
}
