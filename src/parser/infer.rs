//! Logical column type inference from storage kind, format string and
//! byte width.

use crate::metadata::ColumnType;

/// On-disk storage kind of a column, taken from its attribute subheader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    String,
    Number,
    Unknown,
}

const ISO_DATETIME_PREFIXES: [&str; 6] = [
    "B8601DT", "E8601DT", "IS8601DT", "B8601DZ", "E8601DZ", "IS8601DZ",
];

const ISO_TIME_PREFIXES: [&str; 7] = [
    "B8601TM", "E8601TM", "IS8601TM", "B8601TN", "E8601TN", "IS8601TN", "E8601LZ",
];

const ISO_DATE_PREFIXES: [&str; 6] = [
    "B8601DA", "E8601DA", "IS8601DA", "B8601DN", "E8601DN", "IS8601DN",
];

/// ISO date formats whose payload is seconds since the SAS epoch rather
/// than days; these select the datetime-backed date decoder.
const DATE_FROM_DATETIME_PREFIXES: [&str; 3] = ["B8601DN", "E8601DN", "IS8601DN"];

const TIME_NAME_PREFIXES: [&str; 8] = [
    "TIME", "HHMM", "MMSS", "HMS", "TIMEAMPM", "HOUR", "MINUTE", "SECOND",
];

const DATE_NAME_PREFIXES: [&str; 23] = [
    "DATE", "DAY", "YYMMDD", "MMDDYY", "DDMMYY", "JULIAN", "JULDAY", "MONYY", "MMYY", "YYMM",
    "MONNAME", "MONTH", "WEEKDAT", "WORDDAT", "EURDF", "NLDAT", "YYQ", "YYMON", "YEAR", "WEEK",
    "QTR", "QUARTER", "DOWNAME",
];

/// Normalizes a raw format string: trims, upper-cases and strips the
/// trailing width/precision decoration (digits, dots, commas).
#[must_use]
pub fn normalize_format(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ',')
        .to_ascii_uppercase()
}

/// Derives the logical type of a column.
#[must_use]
pub fn infer_column_type(storage: StorageKind, raw_format: &str, length: usize) -> ColumnType {
    match storage {
        StorageKind::String => return ColumnType::String,
        StorageKind::Unknown => return ColumnType::Unknown,
        StorageKind::Number => {}
    }

    let format = normalize_format(raw_format);
    if format.is_empty() || length <= 2 {
        return ColumnType::Number;
    }
    if starts_with_any(&format, &ISO_DATETIME_PREFIXES) {
        return ColumnType::DateTime;
    }
    if starts_with_any(&format, &ISO_TIME_PREFIXES) {
        return ColumnType::Time;
    }
    if starts_with_any(&format, &ISO_DATE_PREFIXES) {
        return ColumnType::Date;
    }
    if format.contains("DATETIME") {
        return ColumnType::DateTime;
    }
    if starts_with_any(&format, &TIME_NAME_PREFIXES) {
        return ColumnType::Time;
    }
    if starts_with_any(&format, &DATE_NAME_PREFIXES) {
        return ColumnType::Date;
    }
    if format.starts_with("DT") || format.ends_with("DT") || format.ends_with("DZ") {
        return ColumnType::DateTime;
    }
    if format.ends_with("TM") || format.ends_with("TN") {
        return ColumnType::Time;
    }
    if format.ends_with("DA") || format.ends_with("DN") {
        return ColumnType::Date;
    }
    ColumnType::Number
}

/// Reports whether a date column's format stores seconds since the SAS
/// epoch instead of days.
#[must_use]
pub fn is_date_from_datetime_format(raw_format: &str) -> bool {
    let format = normalize_format(raw_format);
    starts_with_any(&format, &DATE_FROM_DATETIME_PREFIXES)
}

fn starts_with_any(format: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| format.starts_with(prefix))
}
