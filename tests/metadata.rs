mod common;

use common::{ColumnSpec, build_header, build_plain_file, build_rle_file, write_file};
use sas7bdat_reader::{
    ColumnType, Compression, Endian, Error, Platform, SasReader, WordWidth,
};
use time::Month;

fn sample_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::text("name", 0, 4).labeled("Subject name"),
        ColumnSpec::numeric("x", "", 4, 8),
        ColumnSpec::numeric("d", "YYMMDD10.", 12, 8).labeled("Event date"),
        ColumnSpec::numeric("t", "TIME8.", 20, 8),
    ]
}

fn sample_row(name: &[u8; 4], x: f64, d: f64, t: f64) -> Vec<u8> {
    let mut row = Vec::with_capacity(28);
    row.extend_from_slice(name);
    row.extend_from_slice(&x.to_le_bytes());
    row.extend_from_slice(&d.to_le_bytes());
    row.extend_from_slice(&t.to_le_bytes());
    row
}

#[test]
fn metadata_round_trips_from_a_synthetic_file() {
    let dir = tempfile::tempdir().unwrap();
    let rows = vec![sample_row(b"n   ", 1.0, 23_376.0, 1.0)];
    let image = build_plain_file(&sample_columns(), 28, 1, &rows);
    let path = write_file(&dir, "sample.sas7bdat", &image);

    let reader = SasReader::open(&path).unwrap();
    let metadata = reader.metadata();

    assert_eq!(metadata.endian, Endian::Little);
    assert_eq!(metadata.word_width, WordWidth::Bit64);
    assert_eq!(metadata.platform, Platform::Unix);
    assert_eq!(metadata.encoding, "UTF-8");
    assert_eq!(metadata.dataset_name, "TESTDATA");
    assert_eq!(metadata.file_type, "DATA");
    assert_eq!(metadata.sas_release, "9.0401M2");
    assert_eq!(metadata.sas_server_type, "X64_ESRV");
    assert_eq!(metadata.os_type, "LINUX");
    assert_eq!(metadata.os_name, "X64");
    assert_eq!(metadata.header_length, common::HEADER_LEN);
    assert_eq!(metadata.page_length, common::PAGE_LEN);
    assert_eq!(metadata.page_count, 2);
    assert_eq!(metadata.compression, Compression::None);
    assert_eq!(metadata.row_length, 28);
    assert_eq!(metadata.row_count, 1);
    assert_eq!(metadata.column_count, 4);

    let created = metadata.date_created.expect("created timestamp");
    assert_eq!(
        created.date(),
        time::Date::from_calendar_date(1960, Month::January, 2).unwrap()
    );
    assert_eq!(created.hour(), 1);
}

#[test]
fn columns_carry_schema_and_inferred_types() {
    let dir = tempfile::tempdir().unwrap();
    let image = build_plain_file(&sample_columns(), 28, 0, &[]);
    let path = write_file(&dir, "schema.sas7bdat", &image);

    let reader = SasReader::open(&path).unwrap();
    let columns = reader.columns();
    assert_eq!(columns.len(), 4);

    assert_eq!(columns[0].name, "name");
    assert_eq!(columns[0].label, "Subject name");
    assert_eq!(columns[0].column_type, ColumnType::String);
    assert_eq!((columns[0].offset, columns[0].length), (0, 4));

    assert_eq!(columns[1].name, "x");
    assert_eq!(columns[1].format, "");
    assert_eq!(columns[1].column_type, ColumnType::Number);
    assert_eq!((columns[1].offset, columns[1].length), (4, 8));

    assert_eq!(columns[2].name, "d");
    assert_eq!(columns[2].format, "YYMMDD10.");
    assert_eq!(columns[2].label, "Event date");
    assert_eq!(columns[2].column_type, ColumnType::Date);

    assert_eq!(columns[3].name, "t");
    assert_eq!(columns[3].column_type, ColumnType::Time);

    for (index, column) in columns.iter().enumerate() {
        assert_eq!(column.index, index);
        assert!(column.offset + column.length <= reader.metadata().row_length);
    }
}

#[test]
fn rle_magic_in_the_first_text_block_sets_compression() {
    let dir = tempfile::tempdir().unwrap();
    let columns = [
        ColumnSpec::numeric("id", "", 0, 8),
        ColumnSpec::text("s", 8, 4),
    ];
    let image = build_rle_file(&columns, 24, 0, Vec::new());
    let path = write_file(&dir, "compressed.sas7bdat", &image);

    let reader = SasReader::open(&path).unwrap();
    assert_eq!(reader.metadata().compression, Compression::Rle);
}

#[test]
fn zeroed_magic_is_rejected_without_a_reader() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "zeros.sas7bdat", &vec![0u8; 2048]);
    let err = SasReader::open(&path).unwrap_err();
    assert!(matches!(err, Error::BadMagic));
}

#[test]
fn truncated_header_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let image = build_header(0);
    let path = write_file(&dir, "short-header.sas7bdat", &image[..700]);
    let err = SasReader::open(&path).unwrap_err();
    assert!(matches!(err, Error::Truncated { .. }));
}

#[test]
fn truncated_page_is_rejected_at_open() {
    let dir = tempfile::tempdir().unwrap();
    let rows = vec![sample_row(b"n   ", 1.0, 0.0, 0.0)];
    let image = build_plain_file(&sample_columns(), 28, 1, &rows);
    // Cut the file in the middle of the data page.
    let cut = common::HEADER_LEN + common::PAGE_LEN + common::PAGE_LEN / 2;
    let path = write_file(&dir, "short-page.sas7bdat", &image[..cut]);
    let err = SasReader::open(&path).unwrap_err();
    assert!(matches!(err, Error::Truncated { .. }));
}

#[test]
fn missing_files_surface_their_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-such.sas7bdat");
    let err = SasReader::open(&path).unwrap_err();
    match err {
        Error::FileNotFound { path: reported } => assert_eq!(reported, path),
        other => panic!("expected FileNotFound, got {other:?}"),
    }
}

#[test]
fn metadata_without_a_row_size_subheader_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    // A header promising one page, followed by a page with no subheaders.
    let mut image = build_header(1);
    image.extend(common::build_page_with_subs(0x0000, &[], &[]));
    let path = write_file(&dir, "empty-meta.sas7bdat", &image);
    let err = SasReader::open(&path).unwrap_err();
    assert!(matches!(err, Error::InvalidMetadata { .. }));
}
