pub mod byteorder;
pub mod compression;
pub mod decode;
pub mod encoding;
pub mod header;
pub mod infer;
pub mod metadata;
pub mod page;

pub use decode::FieldDecoder;
pub use header::{MAGIC, ParsedHeader, parse_header};
pub use infer::{StorageKind, infer_column_type};
pub use metadata::{ParsedMetadata, parse_metadata};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::metadata::{Compression, Endian, FileMetadata, Platform, WordWidth};

    /// A blank metadata record for unit tests that exercise one subheader
    /// at a time.
    pub(crate) fn bare_metadata(endian: Endian, word_width: WordWidth) -> FileMetadata {
        FileMetadata {
            endian,
            word_width,
            platform: Platform::Unknown,
            encoding: "WINDOWS-1252",
            dataset_name: String::new(),
            file_type: String::new(),
            sas_release: String::new(),
            sas_server_type: String::new(),
            os_type: String::new(),
            os_name: String::new(),
            creator: String::new(),
            creator_proc: String::new(),
            date_created: None,
            date_modified: None,
            header_length: 1024,
            page_length: 4096,
            page_count: 0,
            compression: Compression::None,
            row_length: 0,
            row_count: 0,
            mix_page_row_count: 0,
            column_count: 0,
            col_count_p1: 0,
            col_count_p2: 0,
            lcs: 0,
            lcp: 0,
        }
    }
}
