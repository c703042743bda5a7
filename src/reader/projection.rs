//! Column-projecting row serializer.

use encoding_rs::Encoding;

use crate::error::{Error, Result, Section};
use crate::metadata::{Column, Endian};
use crate::value::Value;

/// Writes each selected column's decoded cell into the next slot of a
/// destination buffer, always in file order.
#[derive(Debug)]
pub(crate) enum RowSerializer {
    /// One decoded cell per column.
    Full,
    /// Cells only for the selected column indices (kept sorted, so the
    /// write order is file order regardless of how they were requested).
    Subset(Vec<usize>),
}

impl RowSerializer {
    /// Number of cells a serialized row produces.
    pub(crate) fn width(&self, column_count: usize) -> usize {
        match self {
            Self::Full => column_count,
            Self::Subset(indices) => indices.len(),
        }
    }

    /// Decodes one row into `dst`. The buffer is cleared first; on success
    /// it holds exactly [`width`](Self::width) cells.
    pub(crate) fn write_row(
        &self,
        columns: &[Column],
        row: &[u8],
        codec: &'static Encoding,
        endian: Endian,
        row_index: u64,
        dst: &mut Vec<Value>,
    ) -> Result<()> {
        dst.clear();
        match self {
            Self::Full => {
                for column in columns {
                    dst.push(decode_cell(column, row, codec, endian, row_index)?);
                }
            }
            Self::Subset(indices) => {
                for &index in indices {
                    let column = &columns[index];
                    dst.push(decode_cell(column, row, codec, endian, row_index)?);
                }
            }
        }
        Ok(())
    }
}

fn decode_cell(
    column: &Column,
    row: &[u8],
    codec: &'static Encoding,
    endian: Endian,
    row_index: u64,
) -> Result<Value> {
    let cell = row
        .get(column.offset..column.offset + column.length)
        .ok_or_else(|| {
            Error::truncated(
                Section::Row { index: row_index },
                "column slice extends past the row",
            )
        })?;
    column.decoder.decode(cell, codec, endian)
}
