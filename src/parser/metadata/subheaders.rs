//! Subheader descriptors, signature classification and per-type parsers.

use encoding_rs::Encoding;

use crate::error::{Error, Result, Section};
use crate::metadata::{Compression, FileMetadata};
use crate::parser::byteorder::{read_string, read_u16, read_u32, read_uint, slice_at};
use crate::parser::compression::{RDC_MAGIC, RLE_MAGIC};
use crate::parser::infer::StorageKind;

use super::text_pool::TextPool;

/// Compression flag values carried by a subheader descriptor.
pub const COMPRESSION_NONE: u8 = 0;
pub const COMPRESSION_TRUNCATED: u8 = 1;
pub const COMPRESSION_COMPRESSED: u8 = 4;

/// Subtype flag marking a subheader that carries a data row.
pub const SUBTYPE_COMPRESSED: u8 = 1;

/// Classification of a subheader by its leading signature bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubheaderType {
    RowSize,
    ColumnSize,
    SubheaderCounts,
    ColumnText,
    ColumnName,
    ColumnAttributes,
    FormatAndLabel,
    ColumnList,
    Unknown,
}

/// Classifies a 4-byte (Bit32) or 8-byte (Bit64) signature. Multiple byte
/// sequences map to the same type to accommodate endian variations.
#[must_use]
pub fn classify_signature(signature: &[u8]) -> SubheaderType {
    match signature {
        [0xF7, 0xF7, 0xF7, 0xF7]
        | [0x00, 0x00, 0x00, 0x00, 0xF7, 0xF7, 0xF7, 0xF7]
        | [0xF7, 0xF7, 0xF7, 0xF7, 0x00, 0x00, 0x00, 0x00]
        | [0xF7, 0xF7, 0xF7, 0xF7, 0xFF, 0xFF, 0xFB, 0xFE]
        | [0xFF, 0xFF, 0xFB, 0xFE, 0xF7, 0xF7, 0xF7, 0xF7] => SubheaderType::RowSize,

        [0xF6, 0xF6, 0xF6, 0xF6]
        | [0x00, 0x00, 0x00, 0x00, 0xF6, 0xF6, 0xF6, 0xF6]
        | [0xF6, 0xF6, 0xF6, 0xF6, 0x00, 0x00, 0x00, 0x00]
        | [0xF6, 0xF6, 0xF6, 0xF6, 0xFF, 0xFF, 0xFB, 0xFE]
        | [0xFF, 0xFF, 0xFB, 0xFE, 0xF6, 0xF6, 0xF6, 0xF6] => SubheaderType::ColumnSize,

        [0x00, 0xFC, 0xFF, 0xFF]
        | [0xFF, 0xFF, 0xFC, 0x00]
        | [0x00, 0xFC, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        | [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFC, 0x00] => SubheaderType::SubheaderCounts,

        [0xFD, 0xFF, 0xFF, 0xFF]
        | [0xFF, 0xFF, 0xFF, 0xFD]
        | [0xFD, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        | [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFD] => SubheaderType::ColumnText,

        [0xFF, 0xFF, 0xFF, 0xFF]
        | [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF] => SubheaderType::ColumnName,

        [0xFC, 0xFF, 0xFF, 0xFF]
        | [0xFF, 0xFF, 0xFF, 0xFC]
        | [0xFC, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        | [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFC] => SubheaderType::ColumnAttributes,

        [0xFE, 0xFB, 0xFF, 0xFF]
        | [0xFF, 0xFF, 0xFB, 0xFE]
        | [0xFE, 0xFB, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        | [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFB, 0xFE] => SubheaderType::FormatAndLabel,

        [0xFE, 0xFF, 0xFF, 0xFF]
        | [0xFF, 0xFF, 0xFF, 0xFE]
        | [0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        | [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE] => SubheaderType::ColumnList,

        _ => SubheaderType::Unknown,
    }
}

/// Decoded subheader descriptor: payload location plus the two status
/// bytes.
#[derive(Debug, Clone, Copy)]
pub struct SubheaderPointer {
    pub offset: usize,
    pub length: usize,
    pub compression: u8,
    pub subtype: u8,
}

impl SubheaderPointer {
    /// Returns the payload window of this subheader within the page.
    pub fn body<'a>(&self, page: &'a [u8], page_index: usize) -> Result<&'a [u8]> {
        slice_at(
            page,
            self.offset,
            self.length,
            Section::Subheader {
                page: page_index,
                offset: self.offset,
            },
        )
    }

    /// Returns the signature bytes at the head of the payload.
    pub fn signature<'a>(
        &self,
        page: &'a [u8],
        word_width: crate::metadata::WordWidth,
        page_index: usize,
    ) -> Result<&'a [u8]> {
        slice_at(
            page,
            self.offset,
            word_width.signature_width(),
            Section::Subheader {
                page: page_index,
                offset: self.offset,
            },
        )
    }
}

/// Parses the descriptor at `descriptor_offset`: two word-width unsigned
/// integers (payload offset and length) followed by the compression and
/// subtype bytes.
pub fn parse_pointer(
    endian: crate::metadata::Endian,
    word_width: crate::metadata::WordWidth,
    page: &[u8],
    descriptor_offset: usize,
    page_index: usize,
) -> Result<SubheaderPointer> {
    let section = Section::Subheader {
        page: page_index,
        offset: descriptor_offset,
    };
    let width = word_width.integer_width();
    let offset = to_usize(
        read_uint(endian, width, page, descriptor_offset, section)?,
        "subheader offset",
    )?;
    let length = to_usize(
        read_uint(endian, width, page, descriptor_offset + width, section)?,
        "subheader length",
    )?;
    let status = slice_at(page, descriptor_offset + 2 * width, 2, section)?;
    Ok(SubheaderPointer {
        offset,
        length,
        compression: status[0],
        subtype: status[1],
    })
}

fn to_usize(value: u64, what: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| Error::invalid_metadata(format!("{what} exceeds platform pointer width")))
}

/// Per-column attribute record harvested from attribute subheaders.
#[derive(Debug, Clone, Copy)]
pub struct ColumnAttr {
    pub offset: usize,
    pub length: usize,
    pub storage: StorageKind,
}

/// Accumulates the per-column arrays the subheader walk produces. Columns
/// are assembled positionally once every metadata page has been consumed.
#[derive(Debug, Default)]
pub struct ColumnBuilder {
    pub text_pool: TextPool,
    pub names: Vec<String>,
    pub attributes: Vec<ColumnAttr>,
    pub formats: Vec<String>,
    pub labels: Vec<String>,
    pub column_count: Option<usize>,
    pub row_size_seen: bool,
}

/// Consumes the row-size subheader: row geometry plus the `lcs`/`lcp`
/// counts the first column text subheader needs.
pub fn apply_row_size(
    meta: &mut FileMetadata,
    page: &[u8],
    pointer: &SubheaderPointer,
    page_index: usize,
) -> Result<()> {
    let section = Section::Subheader {
        page: page_index,
        offset: pointer.offset,
    };
    let width = meta.word_width.integer_width();
    let (lcs_at, lcp_at) = if meta.word_width.is_64bit() {
        (682, 706)
    } else {
        (354, 378)
    };

    meta.lcs = read_u16(meta.endian, page, pointer.offset + lcs_at, section)?;
    meta.lcp = read_u16(meta.endian, page, pointer.offset + lcp_at, section)?;
    meta.row_length = to_usize(
        read_uint(meta.endian, width, page, pointer.offset + 5 * width, section)?,
        "row length",
    )?;
    meta.row_count = read_uint(meta.endian, width, page, pointer.offset + 6 * width, section)?;
    meta.col_count_p1 = read_uint(meta.endian, width, page, pointer.offset + 9 * width, section)?;
    meta.col_count_p2 = read_uint(meta.endian, width, page, pointer.offset + 10 * width, section)?;
    meta.mix_page_row_count =
        read_uint(meta.endian, width, page, pointer.offset + 15 * width, section)?;
    Ok(())
}

/// Consumes the column-size subheader.
pub fn apply_column_size(
    builder: &mut ColumnBuilder,
    meta: &FileMetadata,
    page: &[u8],
    pointer: &SubheaderPointer,
    page_index: usize,
) -> Result<()> {
    let section = Section::Subheader {
        page: page_index,
        offset: pointer.offset,
    };
    let width = meta.word_width.integer_width();
    let count = read_uint(meta.endian, width, page, pointer.offset + width, section)?;
    builder.column_count = Some(to_usize(count, "column count")?);
    Ok(())
}

/// Consumes a column-text subheader: appends the text block to the pool.
///
/// The first block is special: it advertises the compression codec and
/// carries the creator/creator-proc strings located through `lcs`/`lcp`.
pub fn apply_column_text(
    meta: &mut FileMetadata,
    builder: &mut ColumnBuilder,
    page: &[u8],
    pointer: &SubheaderPointer,
    codec: &'static Encoding,
    page_index: usize,
) -> Result<()> {
    let section = Section::Subheader {
        page: page_index,
        offset: pointer.offset,
    };
    let width = meta.word_width.integer_width();
    let block_len = usize::from(read_u16(meta.endian, page, pointer.offset + width, section)?);
    let block = slice_at(page, pointer.offset + width, block_len, section)?;

    let first = builder.text_pool.is_empty();
    builder.text_pool.push_block(block);
    if !first {
        return Ok(());
    }

    if contains_magic(block, RLE_MAGIC) {
        meta.compression = Compression::Rle;
    } else if contains_magic(block, RDC_MAGIC) {
        meta.compression = Compression::Rdc;
    }

    let creator_at = pointer.offset + if meta.word_width.is_64bit() { 20 } else { 16 };
    let probe = read_string(page, creator_at, 8, codec, section)?;
    if probe.is_empty() {
        meta.lcs = 0;
        meta.creator_proc =
            read_string(page, creator_at + 16, usize::from(meta.lcp), codec, section)?;
    } else if probe == "SASYZCRL" {
        meta.creator_proc =
            read_string(page, creator_at + 24, usize::from(meta.lcp), codec, section)?;
    } else if meta.lcs > 0 {
        meta.lcp = 0;
        meta.creator = read_string(page, creator_at, usize::from(meta.lcs), codec, section)?;
    }
    Ok(())
}

fn contains_magic(block: &[u8], magic: &[u8; 8]) -> bool {
    block.windows(magic.len()).any(|window| window == magic)
}

/// Consumes a column-name subheader: 8-byte entries of text pool
/// references, one per column in file order.
pub fn apply_column_name(
    builder: &mut ColumnBuilder,
    meta: &FileMetadata,
    page: &[u8],
    pointer: &SubheaderPointer,
    codec: &'static Encoding,
    page_index: usize,
) -> Result<()> {
    let section = Section::Subheader {
        page: page_index,
        offset: pointer.offset,
    };
    let width = meta.word_width.integer_width();
    let mut entry = pointer.offset + width + 8;
    let Some(limit) = (pointer.offset + pointer.length).checked_sub(12 + width) else {
        return Ok(());
    };
    while entry <= limit {
        let index = read_u16(meta.endian, page, entry, section)?;
        let offset = read_u16(meta.endian, page, entry + 2, section)?;
        let length = read_u16(meta.endian, page, entry + 4, section)?;
        builder.names.push(builder.text_pool.resolve(
            usize::from(index),
            usize::from(offset),
            usize::from(length),
            codec,
        ));
        entry += 8;
    }
    Ok(())
}

/// Consumes a column-attributes subheader: `width + 8`-byte entries of
/// row offset, byte length and storage kind.
pub fn apply_column_attributes(
    builder: &mut ColumnBuilder,
    meta: &FileMetadata,
    page: &[u8],
    pointer: &SubheaderPointer,
    page_index: usize,
) -> Result<()> {
    let section = Section::Subheader {
        page: page_index,
        offset: pointer.offset,
    };
    let width = meta.word_width.integer_width();
    let mut entry = pointer.offset + width + 8;
    let Some(limit) = (pointer.offset + pointer.length).checked_sub(12 + width) else {
        return Ok(());
    };
    while entry <= limit {
        let offset = to_usize(
            read_uint(meta.endian, width, page, entry, section)?,
            "column offset",
        )?;
        let length = to_usize(
            u64::from(read_u32(meta.endian, page, entry + width, section)?),
            "column length",
        )?;
        let storage_byte = slice_at(page, entry + width + 6, 1, section)?[0];
        let storage = if storage_byte == 1 {
            StorageKind::Number
        } else {
            StorageKind::String
        };
        builder.attributes.push(ColumnAttr {
            offset,
            length,
            storage,
        });
        entry += width + 8;
    }
    Ok(())
}

/// Consumes a format-and-label subheader: six u16 text pool coordinates
/// for one column's format and label.
pub fn apply_format_and_label(
    builder: &mut ColumnBuilder,
    meta: &FileMetadata,
    page: &[u8],
    pointer: &SubheaderPointer,
    codec: &'static Encoding,
    page_index: usize,
) -> Result<()> {
    let section = Section::Subheader {
        page: page_index,
        offset: pointer.offset,
    };
    let base = pointer.offset + 3 * meta.word_width.integer_width();
    let format_index = read_u16(meta.endian, page, base + 22, section)?;
    let format_offset = read_u16(meta.endian, page, base + 24, section)?;
    let format_length = read_u16(meta.endian, page, base + 26, section)?;
    let label_index = read_u16(meta.endian, page, base + 28, section)?;
    let label_offset = read_u16(meta.endian, page, base + 30, section)?;
    let label_length = read_u16(meta.endian, page, base + 32, section)?;

    builder.formats.push(builder.text_pool.resolve(
        usize::from(format_index),
        usize::from(format_offset),
        usize::from(format_length),
        codec,
    ));
    builder.labels.push(builder.text_pool.resolve(
        usize::from(label_index),
        usize::from(label_offset),
        usize::from(label_length),
        codec,
    ));
    Ok(())
}
