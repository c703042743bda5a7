use std::borrow::Cow;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type used across the SAS reader implementation.
pub type Result<T> = std::result::Result<T, Error>;

/// High-level error type surfaced by the SAS reader.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The dataset file does not exist.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// I/O failure while reading from the underlying data source.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A read produced fewer bytes than the format requires.
    #[error("truncated SAS file while reading {section}: {details}")]
    Truncated {
        section: Section,
        details: Cow<'static, str>,
    },

    /// The first 32 bytes do not carry the SAS7BDAT magic number.
    #[error("not a SAS7BDAT file: magic number mismatch")]
    BadMagic,

    /// A compressed block is malformed.
    #[error("corrupted {codec} block: {details}")]
    Codec {
        codec: &'static str,
        details: Cow<'static, str>,
    },

    /// A numeric cell has a width the format cannot encode.
    #[error("numeric cell width {width} outside the supported 1..=8 range")]
    Field { width: usize },

    /// Cooperative cancellation was requested during iteration.
    #[error("row iteration cancelled")]
    Cancelled,

    /// Metadata parsed but could not be interpreted.
    #[error("invalid SAS metadata: {details}")]
    InvalidMetadata { details: Cow<'static, str> },
}

impl Error {
    pub(crate) fn truncated(section: Section, details: impl Into<Cow<'static, str>>) -> Self {
        Self::Truncated {
            section,
            details: details.into(),
        }
    }

    pub(crate) fn codec(codec: &'static str, details: impl Into<Cow<'static, str>>) -> Self {
        Self::Codec {
            codec,
            details: details.into(),
        }
    }

    pub(crate) fn invalid_metadata(details: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidMetadata {
            details: details.into(),
        }
    }
}

/// Logical section of the file used for diagnostic reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Header,
    HeaderExtension,
    Page { index: usize },
    Subheader { page: usize, offset: usize },
    Row { index: u64 },
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => write!(f, "file header"),
            Self::HeaderExtension => write!(f, "file header extension"),
            Self::Page { index } => write!(f, "page {index}"),
            Self::Subheader { page, offset } => {
                write!(f, "subheader at offset {offset} on page {page}")
            }
            Self::Row { index } => write!(f, "row {index}"),
        }
    }
}
