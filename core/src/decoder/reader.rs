//! Verified access to tables in a finished buffer.
//!
//! Every position goes through the `flatbuffers` verifier before it is
//! followed, so a truncated or corrupt buffer yields
//! [`Error::MalformedBuffer`] instead of a panic.

use flatbuffers::{InvalidFlatbuffer, Table, Verifier, VerifierOptions};

use crate::errors::{Error, Result};
use crate::types::{Scalar, ScalarKind, with_scalar_type};

/// The first line of a verifier error, without its trace.
pub(crate) fn headline(err: &InvalidFlatbuffer) -> String {
    let text = err.to_string();
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn invalid(err: InvalidFlatbuffer) -> Error {
    Error::malformed(headline(&err))
}

fn verify<'b, T>(
    buf: &'b [u8],
    check: impl FnOnce(&mut Verifier<'_, 'b>) -> Result<T, InvalidFlatbuffer>,
) -> Result<T> {
    let opts = VerifierOptions::default();
    check(&mut Verifier::new(&opts, buf)).map_err(invalid)
}

/// A table in a buffer, with its vtable already verified.
#[derive(Debug, Clone, Copy)]
pub struct TableReader<'b> {
    table: Table<'b>,
}

impl<'b> TableReader<'b> {
    /// The root table, found through the uoffset at the start of `buf`.
    pub fn root(buf: &'b [u8]) -> Result<Self> {
        let pos = verify(buf, |v| v.get_uoffset(0))?;
        Self::at(buf, pos as usize)
    }

    /// The table starting at `pos`.
    pub fn at(buf: &'b [u8], pos: usize) -> Result<Self> {
        verify(buf, |v| {
            v.visit_table(pos)?.finish();
            Ok(())
        })?;
        // SAFETY: the verifier checked the soffset at `pos` and the whole
        // vtable it points to.
        let table = unsafe { Table::new(buf, pos) };
        Ok(Self { table })
    }

    pub fn buffer(&self) -> &'b [u8] {
        self.table.buf()
    }

    pub fn position(&self) -> usize {
        self.table.loc()
    }

    /// Absolute position of the field at vtable offset `vo`, or `None` if
    /// the field is absent.
    pub fn field(&self, vo: u16) -> Option<usize> {
        match self.table.vtable().get(vo) {
            0 => None,
            offset => Some(self.table.loc() + offset as usize),
        }
    }

    pub fn scalar(&self, vo: u16, kind: ScalarKind) -> Result<Option<Scalar>> {
        let Some(pos) = self.field(vo) else {
            return Ok(None);
        };
        with_scalar_type!(kind, T => {
            verify(self.buffer(), |v| v.in_buffer::<T>(pos))?;
            // SAFETY: an aligned `T` lies inside the buffer at the field.
            Ok(unsafe { self.table.get::<T>(vo, None) }.map(Scalar::from))
        })
    }

    /// Position of whatever the offset field at `vo` points to.
    pub fn indirect(&self, vo: u16) -> Result<Option<usize>> {
        let Some(pos) = self.field(vo) else {
            return Ok(None);
        };
        verify(self.buffer(), |v| {
            let target = pos.saturating_add(v.get_uoffset(pos)? as usize);
            v.range_in_buffer(target, 1)?;
            Ok(Some(target))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatbuffers::FlatBufferBuilder;

    fn one_field_table(v: u32) -> Vec<u8> {
        let mut fbb = FlatBufferBuilder::new();
        let start = fbb.start_table();
        fbb.push_slot_always(4, v);
        let root = fbb.end_table(start);
        fbb.finish_minimal(root);
        fbb.finished_data().to_vec()
    }

    #[test]
    fn test_root_of_truncated_buffer() {
        assert!(TableReader::root(&[]).is_err());
        // Root offset pointing past the end.
        assert!(matches!(
            TableReader::root(&[200, 0, 0, 0]),
            Err(Error::MalformedBuffer { .. })
        ));
    }

    #[test]
    fn test_fields_of_a_verified_table() {
        let bytes = one_field_table(7);
        let table = TableReader::root(&bytes).unwrap();
        assert!(table.field(4).is_some());
        assert_eq!(table.field(6), None);
        assert_eq!(table.scalar(4, ScalarKind::U32).unwrap(), Some(Scalar::U32(7)));
        assert_eq!(table.scalar(6, ScalarKind::U32).unwrap(), None);
    }

    #[test]
    fn test_vtable_offset_out_of_bounds() {
        let mut bytes = one_field_table(7);
        let pos = TableReader::root(&bytes).unwrap().position();
        bytes[pos..pos + 4].copy_from_slice(&i32::MIN.to_le_bytes());
        match TableReader::at(&bytes, pos) {
            Err(Error::MalformedBuffer { reason }) => {
                assert!(reason.contains("out of bounds"), "{reason}");
                assert!(!reason.contains('\n'), "{reason}");
            }
            other => panic!("expected MalformedBuffer, got {other:?}"),
        }
    }
}
