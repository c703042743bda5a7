use std::io::Read;

use encoding_rs::Encoding;

use crate::error::{Error, Result, Section};
use crate::metadata::{Compression, Endian, FileMetadata, Platform, WordWidth};

use super::byteorder::{read_f64, read_string, read_u32};
use super::decode::sas_seconds_instant;
use super::encoding::{encoding_name, resolve_codec};

/// Invariant first 32 bytes of every SAS7BDAT file.
pub const MAGIC: [u8; 32] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC2, 0xEA, 0x81, 0x60,
    0xB3, 0x14, 0x11, 0xCF, 0xBD, 0x92, 0x08, 0x00, 0x09, 0xC7, 0x31, 0x8C, 0x18, 0x1F, 0x10, 0x11,
];

/// Size of the fixed header prefix read before the declared header length
/// is known.
pub const HEADER_PREFIX_LEN: usize = 288;

const ALIGNMENT_MARKER: u8 = b'3';
const ENDIAN_LITTLE: u8 = 0x01;
const PLATFORM_UNIX: u8 = b'1';
const PLATFORM_WINDOWS: u8 = b'2';

/// Header decode result: the file metadata fields the header carries, plus
/// the resolved text codec used for every subsequent string read.
#[derive(Debug)]
pub struct ParsedHeader {
    pub metadata: FileMetadata,
    pub codec: &'static Encoding,
}

/// Parses the SAS7BDAT file header, including the extension read when the
/// declared header length exceeds the fixed prefix.
///
/// On success the reader is positioned at the first page.
///
/// # Errors
///
/// Returns [`Error::BadMagic`] when the magic number does not match and
/// [`Error::Truncated`] when either read comes up short.
pub fn parse_header<R: Read>(reader: &mut R) -> Result<ParsedHeader> {
    let mut buf = vec![0u8; HEADER_PREFIX_LEN];
    read_exact(reader, &mut buf, Section::Header)?;

    if buf[..32] != MAGIC {
        return Err(Error::BadMagic);
    }

    let word_width = if buf[32] == ALIGNMENT_MARKER {
        WordWidth::Bit64
    } else {
        WordWidth::Bit32
    };
    let a2 = if word_width.is_64bit() { 4 } else { 0 };
    let a1 = if buf[35] == ALIGNMENT_MARKER { 4 } else { 0 };
    let total = a1 + a2;

    let endian = if buf[37] == ENDIAN_LITTLE {
        Endian::Little
    } else {
        Endian::Big
    };
    let platform = match buf[39] {
        PLATFORM_UNIX => Platform::Unix,
        PLATFORM_WINDOWS => Platform::Windows,
        _ => Platform::Unknown,
    };
    let encoding = encoding_name(buf[70]);
    let codec = resolve_codec(encoding);

    let header_length = read_u32(endian, &buf, 196 + a1, Section::Header)? as usize;
    if header_length < HEADER_PREFIX_LEN {
        return Err(Error::invalid_metadata(format!(
            "declared header length {header_length} is smaller than the fixed prefix"
        )));
    }
    if header_length > HEADER_PREFIX_LEN {
        buf.resize(header_length, 0);
        read_exact(
            reader,
            &mut buf[HEADER_PREFIX_LEN..],
            Section::HeaderExtension,
        )?;
    }

    let dataset_name = read_string(&buf, 92, 64, codec, Section::Header)?;
    let file_type = read_string(&buf, 156, 8, codec, Section::Header)?;
    let date_created = sas_seconds_instant(read_f64(endian, &buf, 164 + a1, Section::Header)?);
    let date_modified = sas_seconds_instant(read_f64(endian, &buf, 172 + a1, Section::Header)?);
    let page_length = read_u32(endian, &buf, 200 + a1, Section::Header)? as usize;
    let page_count = read_u32(endian, &buf, 204 + a1, Section::Header)? as usize;
    let sas_release = read_string(&buf, 216 + total, 8, codec, Section::Header)?;
    let sas_server_type = read_string(&buf, 224 + total, 16, codec, Section::Header)?;
    let os_type = read_string(&buf, 240 + total, 16, codec, Section::Header)?;
    let os_name = if buf.get(272 + total).copied().unwrap_or(0) != 0 {
        read_string(&buf, 272 + total, 16, codec, Section::Header)?
    } else {
        read_string(&buf, 256 + total, 16, codec, Section::Header)?
    };

    if page_length == 0 {
        return Err(Error::invalid_metadata("page length may not be zero"));
    }

    let metadata = FileMetadata {
        endian,
        word_width,
        platform,
        encoding,
        dataset_name,
        file_type,
        sas_release,
        sas_server_type,
        os_type,
        os_name,
        creator: String::new(),
        creator_proc: String::new(),
        date_created,
        date_modified,
        header_length,
        page_length,
        page_count,
        compression: Compression::None,
        row_length: 0,
        row_count: 0,
        mix_page_row_count: 0,
        column_count: 0,
        col_count_p1: 0,
        col_count_p2: 0,
        lcs: 0,
        lcp: 0,
    };

    Ok(ParsedHeader { metadata, codec })
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], section: Section) -> Result<()> {
    reader.read_exact(buf).map_err(|err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::truncated(section, "read returned fewer bytes than requested")
        } else {
            Error::Io(err)
        }
    })
}
