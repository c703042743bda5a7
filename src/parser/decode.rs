//! Per-cell field decoders: raw bytes to typed values.

use encoding_rs::Encoding;
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time};

use crate::error::{Error, Result};
use crate::metadata::{ColumnType, Endian};
use crate::value::Value;

use super::encoding::trim_field;
use super::infer::is_date_from_datetime_format;

/// Field decoder pre-bound to a column when the schema is assembled.
///
/// Decoders are pure and re-entrant; only the text decoder allocates (for
/// the decoded string).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDecoder {
    Text,
    Number,
    Time,
    DateTime,
    /// Calendar date stored as whole days since the SAS epoch.
    DateDays,
    /// Calendar date stored as seconds since the SAS epoch (the ISO
    /// date-from-datetime formats).
    DateSeconds,
}

impl FieldDecoder {
    /// Selects the decoder for a column from its logical type and format.
    #[must_use]
    pub fn for_column(column_type: ColumnType, format: &str) -> Self {
        match column_type {
            ColumnType::String => Self::Text,
            ColumnType::Number | ColumnType::Unknown => Self::Number,
            ColumnType::Time => Self::Time,
            ColumnType::DateTime => Self::DateTime,
            ColumnType::Date => {
                if is_date_from_datetime_format(format) {
                    Self::DateSeconds
                } else {
                    Self::DateDays
                }
            }
        }
    }

    /// Decodes one cell. Missing values come back as [`Value::Missing`].
    pub fn decode(
        self,
        bytes: &[u8],
        codec: &'static Encoding,
        endian: Endian,
    ) -> Result<Value> {
        match self {
            Self::Text => Ok(Value::Str(decode_text(bytes, codec))),
            Self::Number => {
                Ok(decode_number(bytes, endian)?.map_or(Value::Missing, Value::Number))
            }
            Self::Time => Ok(decode_number(bytes, endian)?
                .map_or(Value::Missing, |seconds| {
                    Value::Time(Duration::seconds(seconds.round() as i64))
                })),
            Self::DateTime => Ok(decode_number(bytes, endian)?
                .and_then(sas_seconds_instant)
                .map_or(Value::Missing, Value::DateTime)),
            Self::DateDays => Ok(decode_number(bytes, endian)?
                .and_then(sas_days_date)
                .map_or(Value::Missing, Value::Date)),
            Self::DateSeconds => Ok(decode_number(bytes, endian)?
                .and_then(sas_seconds_instant)
                .map_or(Value::Missing, |instant| Value::Date(instant.date()))),
        }
    }
}

/// Decodes a text cell: trim trailing `0x00`/`0x20` and leading `0x20`,
/// then decode with the file's codec. An all-blank cell is an empty string,
/// not a missing value.
#[must_use]
pub fn decode_text(bytes: &[u8], codec: &'static Encoding) -> String {
    let trimmed = trim_field(bytes);
    if trimmed.is_empty() {
        return String::new();
    }
    if let Ok(text) = simdutf8::basic::from_utf8(trimmed) {
        return text.to_owned();
    }
    let (decoded, _had_errors) = codec.decode_without_bom_handling(trimmed);
    decoded.into_owned()
}

/// Decodes a numeric cell of width 1..=8. `Ok(None)` marks a missing value.
///
/// # Errors
///
/// Returns [`Error::Field`] for widths above 8; a zero-width cell is
/// missing, not an error.
pub fn decode_number(bytes: &[u8], endian: Endian) -> Result<Option<f64>> {
    let value = match bytes.len() {
        0 => return Ok(None),
        1 => f64::from(bytes[0]),
        2 => {
            let raw = match endian {
                Endian::Little => i16::from_le_bytes([bytes[0], bytes[1]]),
                Endian::Big => i16::from_be_bytes([bytes[0], bytes[1]]),
            };
            f64::from(raw)
        }
        3..=8 => f64::from_bits(numeric_bits(bytes, endian)),
        width => return Err(Error::Field { width }),
    };
    if value.is_nan() {
        Ok(None)
    } else {
        Ok(Some(value))
    }
}

/// Widens a 3..8-byte double image to 64 bits. The stored bytes are always
/// the most significant end; the absent bytes are zero at the least
/// significant end.
fn numeric_bits(bytes: &[u8], endian: Endian) -> u64 {
    debug_assert!(bytes.len() <= 8);
    let mut buf = [0u8; 8];
    match endian {
        Endian::Big => {
            buf[..bytes.len()].copy_from_slice(bytes);
            u64::from_be_bytes(buf)
        }
        Endian::Little => {
            buf[8 - bytes.len()..].copy_from_slice(bytes);
            u64::from_le_bytes(buf)
        }
    }
}

fn sas_epoch() -> PrimitiveDateTime {
    PrimitiveDateTime::new(
        Date::from_calendar_date(1960, Month::January, 1).expect("valid SAS epoch"),
        Time::MIDNIGHT,
    )
}

/// Converts seconds since the SAS epoch to an instant, rounding half away
/// from zero to whole seconds. Out-of-range values are `None`.
pub(crate) fn sas_seconds_instant(seconds: f64) -> Option<OffsetDateTime> {
    if !seconds.is_finite() {
        return None;
    }
    let delta = Duration::checked_seconds_f64(seconds.round())?;
    sas_epoch()
        .checked_add(delta)
        .map(PrimitiveDateTime::assume_utc)
}

fn sas_days_date(days: f64) -> Option<Date> {
    if !days.is_finite() {
        return None;
    }
    sas_epoch()
        .date()
        .checked_add(Duration::days(days.round() as i64))
}
