use time::{Date, Duration, OffsetDateTime};

/// Represents a single cell value produced by the SAS reader.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text converted from the source encoding.
    Str(String),
    /// 64-bit floating point number.
    Number(f64),
    /// SAS date value mapped to a UTC calendar date.
    Date(Date),
    /// SAS datetime value mapped to an instant.
    DateTime(OffsetDateTime),
    /// SAS time value represented as a duration since midnight.
    Time(Duration),
    /// Missing value; distinct from an empty string and from zero.
    Missing,
}

impl Value {
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Returns the numeric payload, if any.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the text payload, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(text) => Some(text),
            _ => None,
        }
    }
}
