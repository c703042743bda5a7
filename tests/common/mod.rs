//! Synthetic SAS7BDAT images for integration tests.
//!
//! Every builder emits a Bit64 little-endian file: a 1024-byte header
//! followed by 4096-byte pages. Subheader payloads are packed from the end
//! of their page, the way SAS lays them out.

#![allow(dead_code)]

pub const HEADER_LEN: usize = 1024;
pub const PAGE_LEN: usize = 4096;

pub const RLE_MAGIC: &[u8; 8] = b"SASYZCRL";

const MAGIC: [u8; 32] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC2, 0xEA, 0x81, 0x60,
    0xB3, 0x14, 0x11, 0xCF, 0xBD, 0x92, 0x08, 0x00, 0x09, 0xC7, 0x31, 0x8C, 0x18, 0x1F, 0x10, 0x11,
];

const PAGE_TYPE_META: u16 = 0x0000;
const PAGE_TYPE_DATA: u16 = 0x0100;
const PAGE_TYPE_MIX: u16 = 0x0200;

#[derive(Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub format: &'static str,
    pub label: &'static str,
    pub offset: usize,
    pub length: usize,
    pub numeric: bool,
}

impl ColumnSpec {
    pub const fn numeric(
        name: &'static str,
        format: &'static str,
        offset: usize,
        length: usize,
    ) -> Self {
        Self {
            name,
            format,
            label: "",
            offset,
            length,
            numeric: true,
        }
    }

    pub const fn text(name: &'static str, offset: usize, length: usize) -> Self {
        Self {
            name,
            format: "",
            label: "",
            offset,
            length,
            numeric: false,
        }
    }

    pub const fn labeled(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }
}

/// A subheader to place on a page: payload plus the descriptor status
/// bytes.
pub struct Sub {
    pub payload: Vec<u8>,
    pub compression: u8,
    pub subtype: u8,
}

impl Sub {
    fn plain(payload: Vec<u8>) -> Self {
        Self {
            payload,
            compression: 0,
            subtype: 0,
        }
    }

    /// An embedded row subheader holding an RLE-compressed body.
    pub fn compressed_row(body: Vec<u8>) -> Self {
        Self {
            payload: body,
            compression: 4,
            subtype: 1,
        }
    }

    /// An embedded row subheader holding the raw row image.
    pub fn raw_row(body: Vec<u8>) -> Self {
        Self {
            payload: body,
            compression: 0,
            subtype: 1,
        }
    }
}

fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_u64(buf: &mut [u8], at: usize, value: u64) {
    buf[at..at + 8].copy_from_slice(&value.to_le_bytes());
}

/// The 1024-byte header of a Bit64 little-endian UTF-8 file.
pub fn build_header(page_count: usize) -> Vec<u8> {
    let mut buf = vec![0u8; HEADER_LEN];
    buf[..32].copy_from_slice(&MAGIC);
    buf[32] = b'3'; // Bit64
    buf[35] = b'3'; // four-byte alignment shift
    buf[37] = 0x01; // little endian
    buf[39] = b'1'; // unix
    buf[70] = 20; // UTF-8
    buf[92..92 + 8].copy_from_slice(b"TESTDATA");
    buf[156..156 + 4].copy_from_slice(b"DATA");
    buf[168..176].copy_from_slice(&90_000.0f64.to_le_bytes());
    buf[176..184].copy_from_slice(&90_000.0f64.to_le_bytes());
    put_u32(&mut buf, 200, HEADER_LEN as u32);
    put_u32(&mut buf, 204, PAGE_LEN as u32);
    put_u32(&mut buf, 208, page_count as u32);
    buf[224..224 + 8].copy_from_slice(b"9.0401M2");
    buf[232..232 + 8].copy_from_slice(b"X64_ESRV");
    buf[248..248 + 5].copy_from_slice(b"LINUX");
    buf[264..264 + 3].copy_from_slice(b"X64");
    buf
}

struct TextLayout {
    block: Vec<u8>,
    name_refs: Vec<(u16, u16)>,
    format_refs: Vec<(u16, u16)>,
    label_refs: Vec<(u16, u16)>,
}

/// Lays out one text pool block: a length prefix, the compression magic
/// slot at block offset 12, and the referenced strings from offset 28.
fn build_text_block(columns: &[ColumnSpec], magic: Option<&[u8; 8]>) -> TextLayout {
    let mut block = vec![0u8; 28];
    if let Some(magic) = magic {
        block[12..20].copy_from_slice(magic);
    }

    fn add(block: &mut Vec<u8>, text: &str) -> (u16, u16) {
        if text.is_empty() {
            return (0, 0);
        }
        let at = block.len() as u16;
        block.extend_from_slice(text.as_bytes());
        (at, text.len() as u16)
    }

    let mut name_refs = Vec::new();
    let mut format_refs = Vec::new();
    let mut label_refs = Vec::new();
    for column in columns {
        name_refs.push(add(&mut block, column.name));
        format_refs.push(add(&mut block, column.format));
        label_refs.push(add(&mut block, column.label));
    }

    let total = block.len() as u16;
    block[0..2].copy_from_slice(&total.to_le_bytes());
    TextLayout {
        block,
        name_refs,
        format_refs,
        label_refs,
    }
}

fn row_size_payload(
    row_length: usize,
    row_count: u64,
    column_count: usize,
    mix_page_row_count: u64,
) -> Vec<u8> {
    let mut payload = vec![0u8; 720];
    payload[0..8].copy_from_slice(&[0xF7, 0xF7, 0xF7, 0xF7, 0x00, 0x00, 0x00, 0x00]);
    put_u64(&mut payload, 40, row_length as u64);
    put_u64(&mut payload, 48, row_count);
    put_u64(&mut payload, 72, column_count as u64);
    put_u64(&mut payload, 80, 0);
    put_u64(&mut payload, 120, mix_page_row_count);
    // lcs (682) and lcp (706) stay zero: no creator strings.
    payload
}

fn column_size_payload(column_count: usize) -> Vec<u8> {
    let mut payload = vec![0u8; 16];
    payload[0..8].copy_from_slice(&[0xF6, 0xF6, 0xF6, 0xF6, 0x00, 0x00, 0x00, 0x00]);
    put_u64(&mut payload, 8, column_count as u64);
    payload
}

fn column_text_payload(block: &[u8]) -> Vec<u8> {
    let mut payload = vec![0u8; 8];
    payload[0..8].copy_from_slice(&[0xFD, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
    payload.extend_from_slice(block);
    payload
}

fn column_name_payload(name_refs: &[(u16, u16)]) -> Vec<u8> {
    let mut payload = vec![0u8; 28 + 8 * name_refs.len()];
    payload[0..8].copy_from_slice(&[0xFF; 8]);
    for (slot, (offset, length)) in name_refs.iter().enumerate() {
        let at = 16 + slot * 8;
        put_u16(&mut payload, at, 0); // pool block index
        put_u16(&mut payload, at + 2, *offset);
        put_u16(&mut payload, at + 4, *length);
    }
    payload
}

fn column_attrs_payload(columns: &[ColumnSpec]) -> Vec<u8> {
    let mut payload = vec![0u8; 28 + 16 * columns.len()];
    payload[0..8].copy_from_slice(&[0xFC, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
    for (slot, column) in columns.iter().enumerate() {
        let at = 16 + slot * 16;
        put_u64(&mut payload, at, column.offset as u64);
        put_u32(&mut payload, at + 8, column.length as u32);
        payload[at + 14] = if column.numeric { 1 } else { 2 };
    }
    payload
}

fn format_label_payload(format_ref: (u16, u16), label_ref: (u16, u16)) -> Vec<u8> {
    let mut payload = vec![0u8; 64];
    payload[0..8].copy_from_slice(&[0xFE, 0xFB, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
    let base = 24;
    put_u16(&mut payload, base + 22, 0);
    put_u16(&mut payload, base + 24, format_ref.0);
    put_u16(&mut payload, base + 26, format_ref.1);
    put_u16(&mut payload, base + 28, 0);
    put_u16(&mut payload, base + 30, label_ref.0);
    put_u16(&mut payload, base + 32, label_ref.1);
    payload
}

/// The metadata subheaders every file needs, in their usual order.
pub fn meta_subheaders(
    columns: &[ColumnSpec],
    row_length: usize,
    row_count: u64,
    mix_page_row_count: u64,
    magic: Option<&[u8; 8]>,
) -> Vec<Sub> {
    let text = build_text_block(columns, magic);
    let mut subs = vec![
        Sub::plain(row_size_payload(
            row_length,
            row_count,
            columns.len(),
            mix_page_row_count,
        )),
        Sub::plain(column_size_payload(columns.len())),
        Sub::plain(column_text_payload(&text.block)),
        Sub::plain(column_name_payload(&text.name_refs)),
        Sub::plain(column_attrs_payload(columns)),
    ];
    for slot in 0..columns.len() {
        subs.push(Sub::plain(format_label_payload(
            text.format_refs[slot],
            text.label_refs[slot],
        )));
    }
    subs
}

/// A page carrying subheaders, and (for mix pages) rows packed after the
/// descriptor array.
pub fn build_page_with_subs(page_type: u16, subs: &[Sub], tail_rows: &[Vec<u8>]) -> Vec<u8> {
    let mut page = vec![0u8; PAGE_LEN];
    put_u16(&mut page, 32, page_type);
    put_u16(&mut page, 34, tail_rows.len() as u16);
    put_u16(&mut page, 36, subs.len() as u16);

    let mut payload_end = PAGE_LEN;
    let mut descriptor = 40;
    for sub in subs {
        let start = (payload_end - sub.payload.len()) & !7;
        page[start..start + sub.payload.len()].copy_from_slice(&sub.payload);
        put_u64(&mut page, descriptor, start as u64);
        put_u64(&mut page, descriptor + 8, sub.payload.len() as u64);
        page[descriptor + 16] = sub.compression;
        page[descriptor + 17] = sub.subtype;
        payload_end = start;
        descriptor += 24;
    }

    let mut at = 40 + subs.len() * 24;
    for row in tail_rows {
        assert!(at + row.len() <= payload_end, "rows collide with payloads");
        page[at..at + row.len()].copy_from_slice(row);
        at += row.len();
    }
    page
}

/// A pure data page: packed rows from offset 40.
pub fn build_data_page(rows: &[Vec<u8>]) -> Vec<u8> {
    let mut page = vec![0u8; PAGE_LEN];
    put_u16(&mut page, 32, PAGE_TYPE_DATA);
    put_u16(&mut page, 34, rows.len() as u16);
    put_u16(&mut page, 36, 0);
    let mut at = 40;
    for row in rows {
        page[at..at + row.len()].copy_from_slice(row);
        at += row.len();
    }
    page
}

/// Header + one meta page + one data page.
pub fn build_plain_file(
    columns: &[ColumnSpec],
    row_length: usize,
    row_count: u64,
    rows: &[Vec<u8>],
) -> Vec<u8> {
    let subs = meta_subheaders(columns, row_length, row_count, 0, None);
    let mut file = build_header(2);
    file.extend(build_page_with_subs(PAGE_TYPE_META, &subs, &[]));
    file.extend(build_data_page(rows));
    file
}

/// Header + one mix page carrying both the metadata and the rows.
pub fn build_mix_file(
    columns: &[ColumnSpec],
    row_length: usize,
    row_count: u64,
    mix_page_row_count: u64,
    rows: &[Vec<u8>],
) -> Vec<u8> {
    let subs = meta_subheaders(columns, row_length, row_count, mix_page_row_count, None);
    let mut file = build_header(1);
    file.extend(build_page_with_subs(PAGE_TYPE_MIX, &subs, rows));
    file
}

/// Header + one meta page whose trailing subheaders are embedded rows of
/// an RLE-compressed dataset.
pub fn build_rle_file(
    columns: &[ColumnSpec],
    row_length: usize,
    row_count: u64,
    row_subs: Vec<Sub>,
) -> Vec<u8> {
    let mut subs = meta_subheaders(columns, row_length, row_count, 0, Some(RLE_MAGIC));
    subs.extend(row_subs);
    let mut file = build_header(1);
    file.extend(build_page_with_subs(PAGE_TYPE_META, &subs, &[]));
    file
}

/// RLE stream for a row image made of a short literal prefix followed by a
/// run of zeros: one COPY command plus one INSERT_ZERO2 command.
pub fn rle_literal_then_zeros(literal: &[u8], zeros: usize) -> Vec<u8> {
    assert!(!literal.is_empty() && literal.len() <= 16);
    assert!((2..=17).contains(&zeros));
    let mut body = vec![0x80 | (literal.len() as u8 - 1)];
    body.extend_from_slice(literal);
    body.push(0xF0 | (zeros as u8 - 2));
    body
}

/// Writes the image to a fresh file under `dir` and returns its path.
pub fn write_file(dir: &tempfile::TempDir, name: &str, image: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, image).expect("write synthetic file");
    path
}
