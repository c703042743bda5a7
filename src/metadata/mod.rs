use time::OffsetDateTime;

use crate::parser::decode::FieldDecoder;

/// Byte order of every multi-byte value in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// Word width of the file layout, fixed by the header alignment bytes.
///
/// It governs the width of every in-page offset, length and count in
/// subheader payloads, and the byte offset of the page header triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordWidth {
    Bit32,
    Bit64,
}

impl WordWidth {
    /// Width in bytes of in-page integers (offsets, lengths, counts).
    #[must_use]
    pub const fn integer_width(self) -> usize {
        match self {
            Self::Bit32 => 4,
            Self::Bit64 => 8,
        }
    }

    /// Byte offset within a page at which the page header triple begins.
    #[must_use]
    pub const fn page_bit_offset(self) -> usize {
        match self {
            Self::Bit32 => 16,
            Self::Bit64 => 32,
        }
    }

    /// Width in bytes of a subheader signature.
    #[must_use]
    pub const fn signature_width(self) -> usize {
        self.integer_width()
    }

    #[must_use]
    pub const fn is_64bit(self) -> bool {
        matches!(self, Self::Bit64)
    }
}

/// Operating system family recorded in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    Windows,
    Unknown,
}

/// Dataset-wide compression scheme detected from the first column text
/// subheader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Rle,
    Rdc,
}

impl Compression {
    #[must_use]
    pub const fn is_compressed(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Logical type of a column, derived from its storage kind, format string
/// and byte width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    String,
    Number,
    Date,
    DateTime,
    Time,
    Unknown,
}

/// File-level metadata decoded once when the reader is opened.
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub endian: Endian,
    pub word_width: WordWidth,
    pub platform: Platform,
    /// Canonical name of the text codec used for every string in the file.
    pub encoding: &'static str,
    pub dataset_name: String,
    pub file_type: String,
    pub sas_release: String,
    pub sas_server_type: String,
    pub os_type: String,
    pub os_name: String,
    pub creator: String,
    pub creator_proc: String,
    pub date_created: Option<OffsetDateTime>,
    pub date_modified: Option<OffsetDateTime>,
    /// Byte count of the full header prefix; pages start here.
    pub header_length: usize,
    /// Byte count of every page (fixed for the whole file).
    pub page_length: usize,
    /// Number of pages after the header.
    pub page_count: usize,
    pub compression: Compression,
    /// Fixed byte width of one observation row.
    pub row_length: usize,
    /// Total observations in the dataset.
    pub row_count: u64,
    /// Maximum number of rows packed into the data region of a mix page.
    pub mix_page_row_count: u64,
    pub column_count: usize,
    // Opaque layout counts consumed while parsing the first column text
    // subheader; kept for diagnostic tooling.
    pub col_count_p1: u64,
    pub col_count_p2: u64,
    pub lcs: u16,
    pub lcp: u16,
}

/// Per-column schema entry, ordered by column index.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub label: String,
    /// Raw SAS format string, e.g. `DATETIME22.3`.
    pub format: String,
    pub column_type: ColumnType,
    /// Byte offset of the cell within a row.
    pub offset: usize,
    /// Byte width of the cell within a row.
    pub length: usize,
    /// Zero-based position in the schema.
    pub index: usize,
    /// Field decoder pre-bound from the column type and format.
    pub decoder: FieldDecoder,
}
