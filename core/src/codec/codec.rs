use std::sync::{Arc, PoisonError, RwLock};

use bumpalo::Bump;
use flatbuffers::FlatBufferBuilder;
use hashbrown::HashMap;
use tracing::{debug, trace, warn};

use super::CodecOptions;
use crate::analyzer::{TableLayout, analyze};
use crate::decoder::{Decoder, TableDecoder};
use crate::encoder::{Encoder, TableEncoder};
use crate::errors::{Error, Result};
use crate::types::Schema;
use crate::values::{Record, RecordBuilder};

/// Everything needed to encode and decode one table type.
#[derive(Debug)]
pub struct TablePlan {
    layout: Arc<TableLayout>,
    encoder: TableEncoder,
    decoder: TableDecoder,
}

impl TablePlan {
    fn new(layout: TableLayout) -> Self {
        let layout = Arc::new(layout);
        Self {
            encoder: TableEncoder::new(layout.clone()),
            decoder: TableDecoder::new(layout.clone()),
            layout,
        }
    }

    pub fn layout(&self) -> &Arc<TableLayout> {
        &self.layout
    }

    pub fn encoder(&self) -> &TableEncoder {
        &self.encoder
    }

    pub fn decoder(&self) -> &TableDecoder {
        &self.decoder
    }
}

/// Encodes and decodes the tables of one schema.
///
/// Plans are built on first use and cached for the codec's lifetime. A codec
/// is `Send + Sync`; any number of threads may encode and decode through it
/// at once.
///
/// # Example
///
/// ```
/// use flatrecord_core::codec::Codec;
/// use flatrecord_core::parser;
///
/// let schema = parser::parse("table Common1 { id: string; count: ubyte; }")?;
/// let codec = Codec::new(schema);
///
/// let record = codec.builder("Common1")?.set("id", "abc").set("count", 5).build()?;
/// let bytes = codec.encode(&record)?;
/// assert_eq!(codec.decode("Common1", &bytes)?, record);
/// # Ok::<(), flatrecord_core::Error>(())
/// ```
#[derive(Debug)]
pub struct Codec {
    schema: Arc<Schema>,
    options: CodecOptions,
    plans: RwLock<HashMap<String, Arc<TablePlan>>>,
}

impl Codec {
    pub fn new(schema: impl Into<Arc<Schema>>) -> Self {
        Self::with_options(schema, CodecOptions::default())
    }

    pub fn with_options(schema: impl Into<Arc<Schema>>, options: CodecOptions) -> Self {
        Self {
            schema: schema.into(),
            options,
            plans: RwLock::new(HashMap::new()),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    /// The plan for `table`, building it (and the plans of every table it
    /// reaches) on first use.
    ///
    /// Nothing is cached when any reachable table fails to analyze, so a
    /// failing table fails the same way on every call.
    pub fn plan(&self, table: &str) -> Result<Arc<TablePlan>> {
        let def = self.schema.table(table).ok_or_else(|| Error::UnknownTable {
            name: table.to_string(),
        })?;
        if let Some(plan) = self.read_plans().get(def.name.as_str()) {
            return Ok(plan.clone());
        }

        let built = self.analyze_reachable(&def.name)?;

        let mut plans = self.plans.write().unwrap_or_else(PoisonError::into_inner);
        for (name, layout) in built {
            if plans.contains_key(name.as_str()) {
                warn!(table = %name, "Discarding plan built by a racing thread");
                continue;
            }
            debug!(table = %name, slots = layout.num_slots(), "Publishing table plan");
            plans.insert(name, Arc::new(TablePlan::new(layout)));
        }
        plans
            .get(def.name.as_str())
            .cloned()
            .ok_or_else(|| Error::UnknownTable {
                name: table.to_string(),
            })
    }

    /// Analyze `root` and every table reachable from it that has no plan yet.
    fn analyze_reachable(&self, root: &str) -> Result<Vec<(String, TableLayout)>> {
        let mut built: Vec<(String, TableLayout)> = Vec::new();
        let mut pending = vec![root.to_string()];
        while let Some(name) = pending.pop() {
            if built.iter().any(|(n, _)| *n == name) || self.read_plans().contains_key(&name) {
                continue;
            }
            let layout = analyze(&self.schema, &name)?;
            pending.extend(layout.referenced_tables().map(str::to_string));
            built.push((name, layout));
        }
        Ok(built)
    }

    fn read_plans(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<TablePlan>>> {
        self.plans.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn layout(&self, table: &str) -> Result<Arc<TableLayout>> {
        Ok(self.plan(table)?.layout().clone())
    }

    /// Analyze every table in the schema. Returns the first failure per
    /// table, in definition order.
    pub fn check(&self) -> Vec<(String, Result<Arc<TableLayout>>)> {
        self.schema
            .tables()
            .map(|def| (def.name.clone(), self.layout(&def.name)))
            .collect()
    }

    /// Start building a record of `table`.
    pub fn builder(&self, table: &str) -> Result<RecordBuilder> {
        Ok(RecordBuilder::new(self.layout(table)?))
    }

    /// Encode `record` as the root of a new buffer.
    pub fn encode(&self, record: &Record) -> Result<Vec<u8>> {
        let mut builder = FlatBufferBuilder::with_capacity(self.options.initial_capacity);
        self.encode_into(record, &mut builder)?;
        Ok(builder.finished_data().to_vec())
    }

    /// Encode `record` into a caller-owned builder, which is reset first.
    ///
    /// On success the buffer is in `builder.finished_data()`. On failure the
    /// builder's contents are unspecified until its next reset.
    pub fn encode_into(&self, record: &Record, builder: &mut FlatBufferBuilder<'_>) -> Result<()> {
        let identifier = self.file_identifier()?;
        builder.reset();
        builder.force_defaults(self.options.force_defaults);

        let arena = Bump::new();
        let root = Encoder::new(self, builder, &arena).encode_root(record)?;
        match identifier {
            Some(id) => builder.finish(root, Some(id)),
            None => builder.finish_minimal(root),
        }
        trace!(
            table = record.table_name(),
            bytes = builder.finished_data().len(),
            "Encoded record"
        );
        Ok(())
    }

    /// Decode a buffer whose root table is a `table`.
    pub fn decode(&self, table: &str, bytes: &[u8]) -> Result<Record> {
        self.check_identifier(bytes)?;
        let record = Decoder::new(self, bytes).decode_root(table)?;
        trace!(table, bytes = bytes.len(), "Decoded record");
        Ok(record)
    }

    /// Decode a buffer whose root table is the schema's `root_type`.
    pub fn decode_root(&self, bytes: &[u8]) -> Result<Record> {
        let root = self
            .schema
            .root_type()
            .ok_or_else(|| Error::mismatch("root_type", "the schema declares no root type"))?;
        self.decode(root, bytes)
    }

    fn file_identifier(&self) -> Result<Option<&str>> {
        match &self.options.file_identifier {
            Some(id) => std::str::from_utf8(id)
                .map(Some)
                .map_err(|_| Error::mismatch("file_identifier", "identifier is not UTF-8")),
            None => Ok(None),
        }
    }

    fn check_identifier(&self, bytes: &[u8]) -> Result<()> {
        let Some(expected) = &self.options.file_identifier else {
            return Ok(());
        };
        match bytes.get(4..8) {
            Some(found) if found == expected => Ok(()),
            _ => Err(Error::malformed(format!(
                "file identifier does not match `{}`",
                String::from_utf8_lossy(expected)
            ))),
        }
    }
}
