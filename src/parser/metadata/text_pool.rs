use encoding_rs::Encoding;

use crate::parser::decode::decode_text;

/// Ordered list of raw text blocks harvested from column text subheaders.
///
/// Name, format and label descriptors cross-reference the pool by
/// `(block index, byte offset, byte length)`; the referenced window is
/// decoded and trimmed on resolution. The pool lives only for the duration
/// of the metadata parse — resolved strings are copied into each column.
#[derive(Debug, Default)]
pub struct TextPool {
    blocks: Vec<Vec<u8>>,
}

impl TextPool {
    #[must_use]
    pub const fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Appends a text block extracted from a column text subheader.
    pub fn push_block(&mut self, block: &[u8]) {
        self.blocks.push(block.to_vec());
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    #[must_use]
    pub fn block(&self, index: usize) -> Option<&[u8]> {
        self.blocks.get(index).map(Vec::as_slice)
    }

    /// Resolves a pool reference to a trimmed, decoded string.
    ///
    /// Extraction is bounded: an invalid block index or an offset past the
    /// block yields an empty string, and the length is truncated to the
    /// remainder of the block.
    #[must_use]
    pub fn resolve(
        &self,
        index: usize,
        offset: usize,
        length: usize,
        codec: &'static Encoding,
    ) -> String {
        let Some(block) = self.blocks.get(index) else {
            return String::new();
        };
        if offset >= block.len() {
            return String::new();
        }
        let end = block.len().min(offset.saturating_add(length));
        decode_text(&block[offset..end], codec)
    }
}
