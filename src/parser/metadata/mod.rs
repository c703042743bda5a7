//! Metadata extraction: walks the pages after the header, consuming the
//! subheader graph until row data begins.

pub mod subheaders;
pub mod text_pool;

use std::io::Read;

use encoding_rs::Encoding;

use crate::error::{Error, Result, Section};
use crate::logger::log_warn;
use crate::metadata::{Column, FileMetadata};
use crate::parser::decode::FieldDecoder;
use crate::parser::infer::{StorageKind, infer_column_type};
use crate::parser::page::{
    PageHeader, PageKind, mix_page_capacity, subheader_descriptor_len,
};

use super::header::parse_header;
use subheaders::{
    COMPRESSION_TRUNCATED, ColumnBuilder, SubheaderType, apply_column_attributes,
    apply_column_name, apply_column_size, apply_column_text, apply_format_and_label,
    apply_row_size, classify_signature, parse_pointer,
};

/// Everything `open` produces: the file metadata, the assembled schema and
/// the resolved text codec.
#[derive(Debug)]
pub struct ParsedMetadata {
    pub metadata: FileMetadata,
    pub columns: Vec<Column>,
    pub codec: &'static Encoding,
}

/// Parses the header and the metadata pages of a SAS7BDAT stream.
///
/// The walk stops at the first pure data page, after the subheaders of the
/// first mix page, or at the end of the file, whichever comes first.
///
/// # Errors
///
/// Returns an error when the header is malformed, a page read comes up
/// short, or the subheader graph is missing its row-size or column-size
/// records.
pub fn parse_metadata<R: Read>(reader: &mut R) -> Result<ParsedMetadata> {
    let parsed = parse_header(reader)?;
    let mut metadata = parsed.metadata;
    let codec = parsed.codec;

    let mut builder = ColumnBuilder::default();
    let mut page = vec![0u8; metadata.page_length];

    for page_index in 0..metadata.page_count {
        read_page(reader, &mut page, page_index)?;
        let header = PageHeader::parse(&page, metadata.endian, metadata.word_width, page_index)?;
        match header.kind() {
            PageKind::Data => break,
            PageKind::Mix => {
                process_page_subheaders(&mut metadata, &mut builder, &page, &header, codec, page_index)?;
                if metadata.mix_page_row_count == 0 {
                    metadata.mix_page_row_count = mix_page_capacity(
                        metadata.word_width,
                        header.clamped_subheader_count(
                            metadata.word_width,
                            metadata.page_length,
                            page_index,
                        ),
                        metadata.page_length,
                        metadata.row_length,
                    );
                }
                break;
            }
            PageKind::Meta | PageKind::Amd | PageKind::MetadataContinuation => {
                process_page_subheaders(&mut metadata, &mut builder, &page, &header, codec, page_index)?;
            }
            PageKind::Unknown => {}
        }
    }

    if !builder.row_size_seen {
        return Err(Error::invalid_metadata(
            "row size subheader missing from SAS metadata",
        ));
    }
    let column_count = builder.column_count.ok_or_else(|| {
        Error::invalid_metadata("column size subheader missing from SAS metadata")
    })?;

    metadata.column_count = column_count;
    let columns = assemble_columns(&metadata, &builder)?;

    Ok(ParsedMetadata {
        metadata,
        columns,
        codec,
    })
}

fn read_page<R: Read>(reader: &mut R, page: &mut [u8], page_index: usize) -> Result<()> {
    reader.read_exact(page).map_err(|err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::truncated(
                Section::Page { index: page_index },
                "page read returned fewer bytes than the declared page length",
            )
        } else {
            Error::Io(err)
        }
    })
}

fn process_page_subheaders(
    metadata: &mut FileMetadata,
    builder: &mut ColumnBuilder,
    page: &[u8],
    header: &PageHeader,
    codec: &'static Encoding,
    page_index: usize,
) -> Result<()> {
    let word_width = metadata.word_width;
    let descriptor_len = subheader_descriptor_len(word_width);
    let count = header.clamped_subheader_count(word_width, page.len(), page_index);
    let mut descriptor = word_width.page_bit_offset() + 8;

    for _ in 0..count {
        let pointer = parse_pointer(metadata.endian, word_width, page, descriptor, page_index)?;
        descriptor += descriptor_len;
        if pointer.length == 0 || pointer.compression == COMPRESSION_TRUNCATED {
            continue;
        }
        let signature = pointer.signature(page, word_width, page_index)?;
        match classify_signature(signature) {
            SubheaderType::RowSize => {
                if builder.row_size_seen {
                    log_warn(&format!(
                        "Ignoring duplicate row size subheader on page {page_index}"
                    ));
                } else {
                    apply_row_size(metadata, page, &pointer, page_index)?;
                    builder.row_size_seen = true;
                }
            }
            SubheaderType::ColumnSize => {
                if builder.column_count.is_some() {
                    log_warn(&format!(
                        "Ignoring duplicate column size subheader on page {page_index}"
                    ));
                } else {
                    apply_column_size(builder, metadata, page, &pointer, page_index)?;
                }
            }
            SubheaderType::ColumnText => {
                apply_column_text(metadata, builder, page, &pointer, codec, page_index)?;
            }
            SubheaderType::ColumnName => {
                apply_column_name(builder, metadata, page, &pointer, codec, page_index)?;
            }
            SubheaderType::ColumnAttributes => {
                apply_column_attributes(builder, metadata, page, &pointer, page_index)?;
            }
            SubheaderType::FormatAndLabel => {
                apply_format_and_label(builder, metadata, page, &pointer, codec, page_index)?;
            }
            // Structurally recognized, semantically ignored.
            SubheaderType::SubheaderCounts | SubheaderType::ColumnList => {}
            // Embedded data rows and vendor extensions; the row reader
            // revisits them.
            SubheaderType::Unknown => {}
        }
    }
    Ok(())
}

/// Produces the ordered schema, defaulting any position the subheaders
/// never filled.
fn assemble_columns(metadata: &FileMetadata, builder: &ColumnBuilder) -> Result<Vec<Column>> {
    let mut columns = Vec::with_capacity(metadata.column_count);
    for index in 0..metadata.column_count {
        let name = builder
            .names
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Column{}", index + 1));
        let attr = builder.attributes.get(index);
        let offset = attr.map_or(0, |attr| attr.offset);
        let length = attr.map_or(0, |attr| attr.length);
        let storage = attr.map_or(StorageKind::Unknown, |attr| attr.storage);
        let format = builder.formats.get(index).cloned().unwrap_or_default();
        let label = builder.labels.get(index).cloned().unwrap_or_default();

        if offset + length > metadata.row_length {
            return Err(Error::invalid_metadata(format!(
                "column {index} extends past the row: offset {offset} + length {length} > row length {}",
                metadata.row_length
            )));
        }

        let column_type = infer_column_type(storage, &format, length);
        let decoder = FieldDecoder::for_column(column_type, &format);
        columns.push(Column {
            name,
            label,
            format,
            column_type,
            offset,
            length,
            index,
            decoder,
        });
    }
    Ok(columns)
}
