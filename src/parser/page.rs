//! Page classification and row enumeration.
//!
//! A page is an in-memory copy of exactly `page_length` bytes. Its header
//! triple (`page_type`, `block_count`, `subheader_count`) sits at the word
//! width's bit offset; `page_type` is a bitfield of a primary type plus
//! modifier flags.

use crate::error::{Error, Result, Section};
use crate::logger::log_warn;
use crate::metadata::{Compression, Endian, WordWidth};

use super::byteorder::read_u16;
use super::compression::decompress_into;
use super::metadata::subheaders::{
    COMPRESSION_COMPRESSED, COMPRESSION_NONE, COMPRESSION_TRUNCATED, SUBTYPE_COMPRESSED,
    SubheaderPointer, SubheaderType, classify_signature, parse_pointer,
};

pub const PAGE_META: u16 = 0x0000;
pub const PAGE_DATA_FLAG: u16 = 0x0100;
pub const PAGE_MIX_FLAG: u16 = 0x0200;
pub const PAGE_AMD: u16 = 0x0400;
pub const PAGE_METADATA_CONTINUATION: u16 = 0x4000;
pub const PAGE_SPECIAL: u16 = 0x8000;
/// Shared bit: `HasDeleted` on data pages, `Extended` on mix pages.
pub const PAGE_DELETED_OR_EXTENDED_FLAG: u16 = 0x0080;
pub const PAGE_COMPRESSED_FLAG: u16 = 0x1000;

/// Decoded page header triple.
#[derive(Debug, Clone, Copy)]
pub struct PageHeader {
    pub page_type: u16,
    pub block_count: u16,
    pub subheader_count: u16,
}

/// Structural classification of a page, closed over the shapes the format
/// defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Meta,
    Data,
    Mix,
    Amd,
    MetadataContinuation,
    Unknown,
}

impl PageHeader {
    /// Reads the header triple from a page buffer.
    pub fn parse(
        page: &[u8],
        endian: Endian,
        word_width: WordWidth,
        page_index: usize,
    ) -> Result<Self> {
        let section = Section::Page { index: page_index };
        let offset = word_width.page_bit_offset();
        Ok(Self {
            page_type: read_u16(endian, page, offset, section)?,
            block_count: read_u16(endian, page, offset + 2, section)?,
            subheader_count: read_u16(endian, page, offset + 4, section)?,
        })
    }

    #[must_use]
    pub const fn is_data(&self) -> bool {
        self.page_type & PAGE_DATA_FLAG != 0
    }

    #[must_use]
    pub const fn is_mix(&self) -> bool {
        self.page_type & PAGE_MIX_FLAG != 0
    }

    #[must_use]
    pub const fn is_meta(&self) -> bool {
        self.page_type == PAGE_META
    }

    #[must_use]
    pub const fn kind(&self) -> PageKind {
        if self.is_data() {
            PageKind::Data
        } else if self.is_mix() {
            PageKind::Mix
        } else if self.is_meta() {
            PageKind::Meta
        } else if self.page_type & PAGE_AMD != 0 {
            PageKind::Amd
        } else if self.page_type & PAGE_METADATA_CONTINUATION != 0 {
            PageKind::MetadataContinuation
        } else {
            PageKind::Unknown
        }
    }

    /// Clamps the declared subheader count so the descriptor array fits the
    /// page, warning when the file over-declares.
    #[must_use]
    pub fn clamped_subheader_count(
        &self,
        word_width: WordWidth,
        page_length: usize,
        page_index: usize,
    ) -> usize {
        let descriptor_len = subheader_descriptor_len(word_width);
        let first = word_width.page_bit_offset() + 8;
        let max = page_length.saturating_sub(first) / descriptor_len;
        let declared = usize::from(self.subheader_count);
        if declared > max {
            log_warn(&format!(
                "Clamping subheader count on page {page_index} (type=0x{:04X}) from {declared} to {max} to fit page bounds",
                self.page_type
            ));
            max
        } else {
            declared
        }
    }
}

/// Byte length of one subheader descriptor.
#[must_use]
pub const fn subheader_descriptor_len(word_width: WordWidth) -> usize {
    3 * word_width.integer_width()
}

/// Offset of the first row of a mix page: the end of the descriptor array
/// rounded up to an 8-byte boundary.
#[must_use]
pub const fn mix_data_start(word_width: WordWidth, subheader_count: usize) -> usize {
    let end = word_width.page_bit_offset() + 8 + subheader_count * subheader_descriptor_len(word_width);
    end.next_multiple_of(8)
}

/// Number of rows the data region of a mix page can hold, used when the
/// row-size subheader did not supply the count.
#[must_use]
pub const fn mix_page_capacity(
    word_width: WordWidth,
    subheader_count: usize,
    page_length: usize,
    row_length: usize,
) -> u64 {
    if row_length == 0 {
        return 0;
    }
    let start = mix_data_start(word_width, subheader_count);
    if start >= page_length {
        return 0;
    }
    ((page_length - start) / row_length) as u64
}

/// A row extracted from a page: either a window into the page buffer or an
/// owned buffer holding a decompressed embedded row.
#[derive(Debug)]
pub enum RowSlot {
    InPage { offset: usize },
    Owned(Vec<u8>),
}

/// Per-file constants the row collector needs.
#[derive(Debug, Clone, Copy)]
pub struct RowContext {
    pub endian: Endian,
    pub word_width: WordWidth,
    pub row_length: usize,
    pub compression: Compression,
    /// Maximum number of rows the data region of a mix page may carry.
    pub mix_page_row_count: u64,
}

/// Enumerates the rows of one page into `slots`.
///
/// Data pages yield `block_count` packed rows, mix pages yield up to
/// `remaining_rows` aligned tail rows, meta pages of compressed files yield
/// embedded subheader rows (decompressing short bodies through buffers
/// drawn from `spare_buffers`). Other pages yield nothing.
pub fn collect_rows(
    page: &[u8],
    header: &PageHeader,
    ctx: RowContext,
    page_index: usize,
    remaining_rows: u64,
    slots: &mut Vec<RowSlot>,
    spare_buffers: &mut Vec<Vec<u8>>,
) -> Result<()> {
    if ctx.row_length == 0 {
        return Ok(());
    }
    if header.is_data() {
        collect_data_rows(page, header, ctx, page_index, slots)
    } else if header.is_mix() {
        collect_mix_rows(page, header, ctx, remaining_rows, slots);
        Ok(())
    } else if header.is_meta() {
        collect_embedded_rows(page, header, ctx, page_index, slots, spare_buffers)
    } else {
        Ok(())
    }
}

fn collect_data_rows(
    page: &[u8],
    header: &PageHeader,
    ctx: RowContext,
    page_index: usize,
    slots: &mut Vec<RowSlot>,
) -> Result<()> {
    let start = ctx.word_width.page_bit_offset() + 8;
    for block in 0..usize::from(header.block_count) {
        let offset = start + block * ctx.row_length;
        if offset + ctx.row_length > page.len() {
            return Err(Error::truncated(
                Section::Page { index: page_index },
                "data row extends past the end of the page",
            ));
        }
        slots.push(RowSlot::InPage { offset });
    }
    Ok(())
}

fn collect_mix_rows(
    page: &[u8],
    header: &PageHeader,
    ctx: RowContext,
    remaining_rows: u64,
    slots: &mut Vec<RowSlot>,
) {
    let subheader_count = usize::from(header.subheader_count);
    let start = mix_data_start(ctx.word_width, subheader_count);
    let count = usize::try_from(remaining_rows.min(ctx.mix_page_row_count)).unwrap_or(usize::MAX);
    for row in 0..count {
        let offset = start + row * ctx.row_length;
        if offset + ctx.row_length > page.len() {
            // The truncated tail row belongs to the next page.
            break;
        }
        slots.push(RowSlot::InPage { offset });
    }
}

fn collect_embedded_rows(
    page: &[u8],
    header: &PageHeader,
    ctx: RowContext,
    page_index: usize,
    slots: &mut Vec<RowSlot>,
    spare_buffers: &mut Vec<Vec<u8>>,
) -> Result<()> {
    if !ctx.compression.is_compressed() {
        // The embedded-row predicate requires a compressed file; the
        // uncompressed case never yields rows from meta pages.
        return Ok(());
    }

    let descriptor_len = subheader_descriptor_len(ctx.word_width);
    let count = header.clamped_subheader_count(ctx.word_width, page.len(), page_index);
    let mut descriptor = ctx.word_width.page_bit_offset() + 8;

    for _ in 0..count {
        let pointer = parse_pointer(ctx.endian, ctx.word_width, page, descriptor, page_index)?;
        descriptor += descriptor_len;
        if pointer.length == 0 || pointer.compression == COMPRESSION_TRUNCATED {
            continue;
        }
        if !is_embedded_row(ctx, page, &pointer, page_index)? {
            continue;
        }
        if pointer.length >= ctx.row_length {
            if pointer.offset + ctx.row_length > page.len() {
                return Err(Error::truncated(
                    Section::Page { index: page_index },
                    "embedded row extends past the end of the page",
                ));
            }
            slots.push(RowSlot::InPage {
                offset: pointer.offset,
            });
        } else {
            let body = pointer.body(page, page_index)?;
            let mut buffer = spare_buffers.pop().unwrap_or_default();
            buffer.resize(ctx.row_length, 0);
            decompress_into(ctx.compression, body, &mut buffer)?;
            slots.push(RowSlot::Owned(buffer));
        }
    }
    Ok(())
}

/// The embedded-row predicate: a compressed file, a plain-or-compressed
/// descriptor with the compressed subtype, and a signature that matches no
/// known metadata subheader.
fn is_embedded_row(
    ctx: RowContext,
    page: &[u8],
    pointer: &SubheaderPointer,
    page_index: usize,
) -> Result<bool> {
    if pointer.compression != COMPRESSION_NONE && pointer.compression != COMPRESSION_COMPRESSED {
        return Ok(false);
    }
    if pointer.subtype != SUBTYPE_COMPRESSED {
        return Ok(false);
    }
    let signature = pointer.signature(page, ctx.word_width, page_index)?;
    Ok(classify_signature(signature) == SubheaderType::Unknown)
}
