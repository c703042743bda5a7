//! Streaming reader for the SAS7BDAT binary dataset format.
//!
//! Opening a file decodes its header and metadata pages into
//! [`FileMetadata`] and an ordered [`Column`] schema; rows are then
//! decoded lazily, one page at a time, into typed [`Value`] cells with
//! missing values surfaced as [`Value::Missing`].
//!
//! ```no_run
//! use sas7bdat_reader::{ReadOptions, SasReader};
//!
//! # fn main() -> sas7bdat_reader::Result<()> {
//! let reader = SasReader::open("dataset.sas7bdat")?;
//! println!("{} rows", reader.metadata().row_count);
//! let mut rows = reader.read_rows(&ReadOptions::new())?;
//! while let Some(row) = rows.try_next()? {
//!     println!("{row:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod logger;
pub mod metadata;
pub mod parser;
pub mod reader;
pub mod value;

pub use error::{Error, Result, Section};
pub use metadata::{
    Column, ColumnType, Compression, Endian, FileMetadata, Platform, WordWidth,
};
pub use reader::{CancelToken, ReadOptions, Records, RowStream, SasReader};
pub use value::Value;
