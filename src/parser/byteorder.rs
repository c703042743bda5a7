use encoding_rs::Encoding;

use crate::error::{Error, Result, Section};
use crate::metadata::Endian;

/// Returns the `len`-byte window of `buf` starting at `offset`.
///
/// # Errors
///
/// Returns [`Error::Truncated`] when the window exceeds the buffer.
pub fn slice_at(buf: &[u8], offset: usize, len: usize, section: Section) -> Result<&[u8]> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| Error::truncated(section, "byte window overflows"))?;
    buf.get(offset..end)
        .ok_or_else(|| Error::truncated(section, "byte window exceeds buffer"))
}

pub fn read_u16(endian: Endian, buf: &[u8], offset: usize, section: Section) -> Result<u16> {
    let bytes = slice_at(buf, offset, 2, section)?;
    Ok(match endian {
        Endian::Little => u16::from_le_bytes([bytes[0], bytes[1]]),
        Endian::Big => u16::from_be_bytes([bytes[0], bytes[1]]),
    })
}

pub fn read_i16(endian: Endian, buf: &[u8], offset: usize, section: Section) -> Result<i16> {
    let bytes = slice_at(buf, offset, 2, section)?;
    Ok(match endian {
        Endian::Little => i16::from_le_bytes([bytes[0], bytes[1]]),
        Endian::Big => i16::from_be_bytes([bytes[0], bytes[1]]),
    })
}

pub fn read_u32(endian: Endian, buf: &[u8], offset: usize, section: Section) -> Result<u32> {
    let bytes = slice_at(buf, offset, 4, section)?;
    let bytes: [u8; 4] = bytes.try_into().expect("window is four bytes");
    Ok(match endian {
        Endian::Little => u32::from_le_bytes(bytes),
        Endian::Big => u32::from_be_bytes(bytes),
    })
}

pub fn read_u64(endian: Endian, buf: &[u8], offset: usize, section: Section) -> Result<u64> {
    let bytes = slice_at(buf, offset, 8, section)?;
    let bytes: [u8; 8] = bytes.try_into().expect("window is eight bytes");
    Ok(match endian {
        Endian::Little => u64::from_le_bytes(bytes),
        Endian::Big => u64::from_be_bytes(bytes),
    })
}

/// Reads an unsigned integer whose width is only known at run time.
///
/// The width comes from the file's word width, so it is 4 or 8 in practice;
/// 1 and 2 are accepted for completeness.
pub fn read_uint(
    endian: Endian,
    width: usize,
    buf: &[u8],
    offset: usize,
    section: Section,
) -> Result<u64> {
    match width {
        1 => Ok(u64::from(
            slice_at(buf, offset, 1, section)?[0],
        )),
        2 => read_u16(endian, buf, offset, section).map(u64::from),
        4 => read_u32(endian, buf, offset, section).map(u64::from),
        8 => read_u64(endian, buf, offset, section),
        other => Err(Error::invalid_metadata(format!(
            "unsupported integer width {other}"
        ))),
    }
}

/// Reads an IEEE-754 double as a 64-bit integer at the declared endianness,
/// then bit-casts. This matches the on-disk representation regardless of the
/// host float endianness.
pub fn read_f64(endian: Endian, buf: &[u8], offset: usize, section: Section) -> Result<f64> {
    read_u64(endian, buf, offset, section).map(f64::from_bits)
}

/// Reads a fixed-width string field: trims trailing `0x00`/`0x20` bytes and
/// leading `0x20` bytes, then decodes with the supplied codec.
pub fn read_string(
    buf: &[u8],
    offset: usize,
    len: usize,
    codec: &'static Encoding,
    section: Section,
) -> Result<String> {
    let bytes = slice_at(buf, offset, len, section)?;
    Ok(super::decode::decode_text(bytes, codec))
}
