//! Forward-only row iteration over the pages of an open dataset.

use std::fs::File;
use std::io::Read;

use encoding_rs::Encoding;

use crate::error::{Error, Result, Section};
use crate::metadata::{Column, FileMetadata};
use crate::parser::page::{PageHeader, RowContext, RowSlot, collect_rows};
use crate::value::Value;

use super::projection::RowSerializer;
use super::{CancelToken, ReadOptions};

/// Lazy, cancellable, forward-only sequence of decoded rows.
///
/// Each stream owns a private sequential file handle positioned after the
/// header, two page buffers that alternate as pages are fetched, and the
/// destination buffer its rows are serialized into. [`try_next`] yields a
/// window into that buffer, valid until the next call; the [`Iterator`]
/// implementation clones the cells out instead.
///
/// [`try_next`]: RowStream::try_next
#[derive(Debug)]
pub struct RowStream<'a> {
    file: File,
    metadata: &'a FileMetadata,
    columns: &'a [Column],
    codec: &'static Encoding,
    serializer: RowSerializer,
    buffers: [Vec<u8>; 2],
    active: usize,
    slots: Vec<RowSlot>,
    slot_cursor: usize,
    spare_row_buffers: Vec<Vec<u8>>,
    dst: Vec<Value>,
    pages_read: usize,
    /// Rows enumerated from pages so far, including skipped ones.
    produced: u64,
    /// Rows handed to the caller.
    returned: u64,
    skip_remaining: u64,
    max_rows: Option<u64>,
    cancel: Option<CancelToken>,
    exhausted: bool,
}

impl<'a> RowStream<'a> {
    pub(crate) fn new(
        file: File,
        metadata: &'a FileMetadata,
        columns: &'a [Column],
        codec: &'static Encoding,
        serializer: RowSerializer,
        options: &ReadOptions,
    ) -> Self {
        let page_length = metadata.page_length;
        let buffer_capacity = options
            .file_buffer_size
            .map_or(page_length, |size| page_length.max(size / 2));
        let make_buffer = || {
            let mut buffer = Vec::with_capacity(buffer_capacity);
            buffer.resize(page_length, 0);
            buffer
        };
        let width = serializer.width(columns.len());
        Self {
            file,
            metadata,
            columns,
            codec,
            serializer,
            buffers: [make_buffer(), make_buffer()],
            active: 0,
            slots: Vec::new(),
            slot_cursor: 0,
            spare_row_buffers: Vec::new(),
            dst: Vec::with_capacity(width),
            pages_read: 0,
            produced: 0,
            returned: 0,
            skip_remaining: options.skip_rows,
            max_rows: options.max_rows,
            cancel: options.cancel.clone(),
            exhausted: false,
        }
    }

    /// Number of cells each yielded row carries.
    #[must_use]
    pub fn row_width(&self) -> usize {
        self.serializer.width(self.columns.len())
    }

    /// Advances the stream by one row.
    ///
    /// The returned slice aliases the stream's destination buffer and is
    /// only valid until the next call.
    ///
    /// # Errors
    ///
    /// Returns an error when a page read comes up short, a cell fails to
    /// decode, or cancellation was requested. Any error ends the stream.
    pub fn try_next(&mut self) -> Result<Option<&[Value]>> {
        if self.exhausted {
            return Ok(None);
        }
        if self.is_cancelled() {
            self.exhausted = true;
            return Err(Error::Cancelled);
        }

        loop {
            if self.produced >= self.metadata.row_count {
                self.exhausted = true;
                return Ok(None);
            }
            if let Some(max) = self.max_rows
                && self.returned >= max
            {
                self.exhausted = true;
                return Ok(None);
            }

            if self.slot_cursor >= self.slots.len() {
                match self.fetch_next_page() {
                    Ok(true) => {}
                    Ok(false) => {
                        self.exhausted = true;
                        return Ok(None);
                    }
                    Err(err) => {
                        self.exhausted = true;
                        return Err(err);
                    }
                }
            }

            let slot_index = self.slot_cursor;
            self.slot_cursor += 1;
            let row_index = self.produced;
            self.produced += 1;

            if self.skip_remaining > 0 {
                self.skip_remaining -= 1;
                continue;
            }

            let row = match &self.slots[slot_index] {
                RowSlot::InPage { offset } => {
                    &self.buffers[self.active][*offset..*offset + self.metadata.row_length]
                }
                RowSlot::Owned(buffer) => buffer.as_slice(),
            };
            if let Err(err) = self.serializer.write_row(
                self.columns,
                row,
                self.codec,
                self.metadata.endian,
                row_index,
                &mut self.dst,
            ) {
                self.exhausted = true;
                return Err(err);
            }
            self.returned += 1;
            return Ok(Some(&self.dst));
        }
    }

    /// Fetches pages until one yields rows, filling `self.slots`. Returns
    /// `false` at the end of the dataset.
    fn fetch_next_page(&mut self) -> Result<bool> {
        let ctx = RowContext {
            endian: self.metadata.endian,
            word_width: self.metadata.word_width,
            row_length: self.metadata.row_length,
            compression: self.metadata.compression,
            mix_page_row_count: self.metadata.mix_page_row_count,
        };

        while self.pages_read < self.metadata.page_count {
            // Alternate buffers so rows already yielded from the previous
            // page never alias the one being refilled.
            self.active ^= 1;
            self.recycle_slots();

            let page_index = self.pages_read;
            read_page(&mut self.file, &mut self.buffers[self.active], page_index)?;
            self.pages_read += 1;
            if self.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let header = PageHeader::parse(
                &self.buffers[self.active],
                self.metadata.endian,
                self.metadata.word_width,
                page_index,
            )?;
            let remaining = self.metadata.row_count.saturating_sub(self.produced);
            collect_rows(
                &self.buffers[self.active],
                &header,
                ctx,
                page_index,
                remaining,
                &mut self.slots,
                &mut self.spare_row_buffers,
            )?;

            if !self.slots.is_empty() {
                self.slot_cursor = 0;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn recycle_slots(&mut self) {
        self.slot_cursor = 0;
        for slot in self.slots.drain(..) {
            if let RowSlot::Owned(mut buffer) = slot {
                buffer.clear();
                self.spare_row_buffers.push(buffer);
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancelToken::is_cancelled)
    }
}

fn read_page(file: &mut File, page: &mut [u8], page_index: usize) -> Result<()> {
    file.read_exact(page).map_err(|err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::truncated(
                Section::Page { index: page_index },
                "page read returned fewer bytes than the declared page length",
            )
        } else {
            Error::Io(err)
        }
    })
}

impl Iterator for RowStream<'_> {
    type Item = Result<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.try_next() {
            Ok(Some(row)) => Some(Ok(row.to_vec())),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

/// Row stream combined with a caller-supplied per-row mapper.
pub struct Records<'a, F> {
    stream: RowStream<'a>,
    transform: F,
}

impl<'a, F> Records<'a, F> {
    pub(crate) fn new(stream: RowStream<'a>, transform: F) -> Self {
        Self { stream, transform }
    }
}

impl<T, F> Records<'_, F>
where
    F: FnMut(&[Value]) -> T,
{
    /// Advances the stream and maps the next row.
    ///
    /// # Errors
    ///
    /// Propagates row decoding failures.
    pub fn try_next(&mut self) -> Result<Option<T>> {
        Ok(self.stream.try_next()?.map(&mut self.transform))
    }
}

impl<T, F> Iterator for Records<'_, F>
where
    F: FnMut(&[Value]) -> T,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.try_next().transpose()
    }
}
