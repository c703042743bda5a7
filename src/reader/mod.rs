//! Public reader facade: open a dataset, inspect its schema, stream rows.

mod projection;
mod rows;

pub use rows::{Records, RowStream};

use std::collections::HashSet;
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};
use crate::metadata::{Column, FileMetadata};
use crate::parser::{ParsedMetadata, parse_metadata};
use crate::value::Value;

use projection::RowSerializer;

/// Cooperative cancellation flag shared between a row stream and the code
/// driving it.
///
/// Cheap to clone; cancelling any clone cancels them all. A cancelled
/// stream surfaces [`Error::Cancelled`] once and then terminates.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Configures pagination, projection and cancellation for row streams.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    skip_rows: u64,
    max_rows: Option<u64>,
    column_indices: Option<Vec<usize>>,
    column_names: Option<Vec<String>>,
    file_buffer_size: Option<usize>,
    cancel: Option<CancelToken>,
}

impl ReadOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards the first `count` rows before yielding any.
    #[must_use]
    pub const fn with_skip_rows(mut self, count: u64) -> Self {
        self.skip_rows = count;
        self
    }

    /// Caps the number of rows the stream yields.
    #[must_use]
    pub const fn with_max_rows(mut self, count: u64) -> Self {
        self.max_rows = Some(count);
        self
    }

    /// Selects columns by schema index. Overrides
    /// [`with_column_names`](Self::with_column_names) when both are given.
    #[must_use]
    pub fn with_column_indices<I>(mut self, indices: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let collected: Vec<usize> = indices.into_iter().collect();
        self.column_indices = if collected.is_empty() {
            None
        } else {
            Some(collected)
        };
        self
    }

    /// Selects columns by name.
    #[must_use]
    pub fn with_column_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut collected: Vec<String> = names.into_iter().map(Into::into).collect();
        collected.retain(|name| !name.is_empty());
        self.column_names = if collected.is_empty() {
            None
        } else {
            Some(collected)
        };
        self
    }

    /// Floors the capacity of the stream's page buffers.
    #[must_use]
    pub const fn with_file_buffer_size(mut self, size: usize) -> Self {
        self.file_buffer_size = Some(size);
        self
    }

    /// Attaches a cancellation token checked at every suspension point.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Resolves the configured selection to sorted column indices, or
    /// `None` for a full projection. Indices win over names.
    fn resolve_projection(&self, columns: &[Column]) -> Result<Option<Vec<usize>>> {
        if let Some(indices) = &self.column_indices {
            let mut seen = HashSet::with_capacity(indices.len());
            for &index in indices {
                if index >= columns.len() {
                    return Err(Error::invalid_metadata(format!(
                        "column projection index {index} exceeds column count {}",
                        columns.len()
                    )));
                }
                if !seen.insert(index) {
                    return Err(Error::invalid_metadata(format!(
                        "duplicate column projection index {index}"
                    )));
                }
            }
            let mut sorted: Vec<usize> = indices.clone();
            sorted.sort_unstable();
            return Ok(Some(sorted));
        }

        let Some(names) = &self.column_names else {
            return Ok(None);
        };

        let mut resolved = Vec::with_capacity(names.len());
        let mut seen = HashSet::with_capacity(names.len());
        for name in names {
            let index = columns
                .iter()
                .find(|column| column.name == *name || column.name.trim_end() == name.trim_end())
                .map(|column| column.index)
                .ok_or_else(|| {
                    Error::invalid_metadata(format!("column name '{name}' not found in metadata"))
                })?;
            if !seen.insert(index) {
                return Err(Error::invalid_metadata(format!(
                    "column projection resolves duplicate column index {index} for name '{name}'"
                )));
            }
            resolved.push(index);
        }
        resolved.sort_unstable();
        Ok(Some(resolved))
    }
}

/// An open SAS7BDAT dataset.
///
/// The reader holds its own read-only handle for its whole lifetime; every
/// row stream opens a fresh sequential handle, so concurrent streams over
/// the same reader path are independent.
#[derive(Debug)]
pub struct SasReader {
    path: PathBuf,
    _lock: File,
    parsed: ParsedMetadata,
}

impl SasReader {
    /// Opens a dataset: parses the header and every metadata page, and
    /// keeps the file handle for the reader's lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileNotFound`] for a missing path and a
    /// corruption/format error when the header or metadata cannot be
    /// decoded; no reader is produced in either case.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound { path: path.clone() }
            } else {
                Error::Io(err)
            }
        })?;
        let parsed = parse_metadata(&mut file)?;
        Ok(Self {
            path,
            _lock: file,
            parsed,
        })
    }

    /// File-level metadata decoded at open time.
    #[must_use]
    pub const fn metadata(&self) -> &FileMetadata {
        &self.parsed.metadata
    }

    /// The ordered column schema.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.parsed.columns
    }

    /// Starts a lazy, forward-only row stream configured by `options`.
    ///
    /// # Errors
    ///
    /// Returns an error when the projection cannot be resolved or the
    /// stream's file handle cannot be opened.
    pub fn read_rows(&self, options: &ReadOptions) -> Result<RowStream<'_>> {
        let serializer = match options.resolve_projection(&self.parsed.columns)? {
            Some(indices) => RowSerializer::Subset(indices),
            None => RowSerializer::Full,
        };
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.parsed.metadata.header_length as u64))?;
        Ok(RowStream::new(
            file,
            &self.parsed.metadata,
            &self.parsed.columns,
            self.parsed.codec,
            serializer,
            options,
        ))
    }

    /// Like [`read_rows`](Self::read_rows), with a caller-supplied per-row
    /// mapper applied to every yielded row.
    ///
    /// # Errors
    ///
    /// Same as [`read_rows`](Self::read_rows).
    pub fn read_records<T, F>(&self, transform: F, options: &ReadOptions) -> Result<Records<'_, F>>
    where
        F: FnMut(&[Value]) -> T,
    {
        Ok(Records::new(self.read_rows(options)?, transform))
    }

    /// Releases the reader and its lock handle.
    pub fn close(self) {
        drop(self);
    }
}
