//! Output codecs: merged table → CSV, Parquet, or a zip of per-document
//! files.
//!
//! Encoders write into an in-memory buffer and only hand it back once the
//! format's trailer has been written, so a failure never yields a truncated
//! artifact.

use crate::config::OutputFormat;
use crate::error::ExtractError;
use crate::table::{Cell, MergedTable};
use arrow_array::{ArrayRef, Float64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::io::{Cursor, Write};
use std::sync::Arc;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Encode `table` in `format`.
pub fn encode_table(table: &MergedTable, format: OutputFormat) -> Result<Vec<u8>, ExtractError> {
    let bytes = match format {
        OutputFormat::Csv => encode_csv(table)?,
        OutputFormat::Parquet => encode_parquet(table)?,
    };
    debug!(
        "Encoded {} rows × {} columns as {} ({} bytes)",
        table.row_count(),
        table.columns.len(),
        format,
        bytes.len()
    );
    Ok(bytes)
}

// ── CSV ──────────────────────────────────────────────────────────────────

fn csv_error(e: impl std::fmt::Display) -> ExtractError {
    ExtractError::Encode {
        format: OutputFormat::Csv.to_string(),
        detail: e.to_string(),
    }
}

/// Header row, then one record per row; missing cells are empty fields.
pub fn encode_csv(table: &MergedTable) -> Result<Vec<u8>, ExtractError> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(&table.columns).map_err(csv_error)?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(Cell::text))
            .map_err(csv_error)?;
    }
    writer.into_inner().map_err(csv_error)
}

// ── Parquet ──────────────────────────────────────────────────────────────

fn parquet_error(e: impl std::fmt::Display) -> ExtractError {
    ExtractError::Encode {
        format: OutputFormat::Parquet.to_string(),
        detail: e.to_string(),
    }
}

/// A column is numeric when it has at least one value and every value
/// present parses as a number.
fn is_numeric_column(table: &MergedTable, index: usize) -> bool {
    let mut present = table.column(index).filter(|cell| !cell.is_blank()).peekable();
    present.peek().is_some() && present.all(Cell::is_numeric)
}

fn numeric_value(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Numeric(text) => text.replace(',', "").parse().ok(),
        _ => None,
    }
}

fn text_value(cell: &Cell) -> Option<&str> {
    if cell.is_blank() {
        None
    } else {
        cell.as_str()
    }
}

/// One nullable column per merged column: `Float64` when every present value
/// is numeric, `Utf8` otherwise. Snappy-compressed.
pub fn encode_parquet(table: &MergedTable) -> Result<Vec<u8>, ExtractError> {
    let mut fields = Vec::with_capacity(table.columns.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.columns.len());

    for (index, name) in table.columns.iter().enumerate() {
        if is_numeric_column(table, index) {
            fields.push(Field::new(name, DataType::Float64, true));
            let values: Vec<Option<f64>> = table.column(index).map(numeric_value).collect();
            arrays.push(Arc::new(Float64Array::from(values)));
        } else {
            fields.push(Field::new(name, DataType::Utf8, true));
            let values: Vec<Option<&str>> = table.column(index).map(text_value).collect();
            arrays.push(Arc::new(StringArray::from(values)));
        }
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays).map_err(parquet_error)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, schema, Some(props)).map_err(parquet_error)?;
    writer.write(&batch).map_err(parquet_error)?;
    writer.close().map_err(parquet_error)?;
    Ok(buf)
}

// ── Archive ──────────────────────────────────────────────────────────────

/// Zip already-encoded files. Entries keep the given order.
pub fn encode_archive(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>, ExtractError> {
    let zip_error = |e: &dyn std::fmt::Display| ExtractError::Encode {
        format: "zip".to_string(),
        detail: e.to_string(),
    };

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in entries {
        zip.start_file(name.as_str(), options)
            .map_err(|e| zip_error(&e))?;
        zip.write_all(bytes).map_err(|e| zip_error(&e))?;
    }
    let cursor = zip.finish().map_err(|e| zip_error(&e))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MergedTable {
        MergedTable {
            columns: vec!["Name".into(), "Amount".into()],
            rows: vec![
                vec![Cell::Text("Alice".into()), Cell::Numeric("1,200".into())],
                vec![Cell::Text("Bob, Jr.".into()), Cell::Missing],
            ],
        }
    }

    #[test]
    fn csv_has_header_and_empty_missing_fields() {
        let bytes = encode_csv(&sample()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "Name,Amount\nAlice,\"1,200\"\n\"Bob, Jr.\",\n");
    }

    #[test]
    fn numeric_column_detection() {
        let table = sample();
        assert!(!is_numeric_column(&table, 0));
        assert!(is_numeric_column(&table, 1));

        let empty = MergedTable {
            columns: vec!["A".into()],
            rows: vec![vec![Cell::Missing]],
        };
        assert!(!is_numeric_column(&empty, 0));
    }

    #[test]
    fn parquet_has_magic_footer() {
        let bytes = encode_parquet(&sample()).unwrap();
        assert_eq!(&bytes[..4], b"PAR1");
        assert_eq!(&bytes[bytes.len() - 4..], b"PAR1");
    }

    #[test]
    fn csv_round_trip_preserves_every_cell() {
        let table = MergedTable {
            columns: vec!["Name, full".into(), "Note".into(), "Amount".into()],
            rows: vec![
                vec![
                    Cell::parse("Smith, \"Jo\""),
                    Cell::parse("line one\nline two"),
                    Cell::parse("1,200.50"),
                ],
                vec![Cell::Missing, Cell::parse("a \"quoted\" word"), Cell::Missing],
                vec![Cell::parse("Lee"), Cell::Missing, Cell::parse("-3")],
            ],
        };
        let bytes = encode_csv(&table).unwrap();

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let header: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(header, table.columns);

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), table.row_count());
        for (record, row) in records.iter().zip(&table.rows) {
            assert_eq!(record.len(), row.len());
            for (field, cell) in record.iter().zip(row) {
                assert_eq!(field, cell.text());
            }
        }
    }

    #[test]
    fn parquet_keeps_ambiguous_commas_as_text() {
        use bytes::Bytes;
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

        let table = MergedTable {
            columns: vec!["Amount".into()],
            rows: vec![vec![Cell::parse("1,2")], vec![Cell::parse("3")]],
        };
        assert!(!is_numeric_column(&table, 0));

        let bytes = encode_parquet(&table).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(Bytes::from(bytes))
            .unwrap()
            .build()
            .unwrap();
        let batch = reader.map(|b| b.unwrap()).next().unwrap();
        assert_eq!(batch.schema().field(0).data_type(), &DataType::Utf8);
        let values = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(values.value(0), "1,2");
        assert_eq!(values.value(1), "3");
    }

    #[test]
    fn archive_is_a_zip() {
        let bytes = encode_archive(&[("000_a.csv".into(), b"A\n1\n".to_vec())]).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
