//! CSV in and out through Arrow record batches.

use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, LargeStringArray, StringArray};
use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::record_batch::RecordBatch;
use tempfile::NamedTempFile;

use crate::StoreError;
use crate::schema::text_schema;

const BATCH_SIZE: usize = 8192;

/// A CSV file read as text columns.
pub struct TextTable {
    pub headers: Vec<String>,
    pub batches: Vec<RecordBatch>,
}

impl TextTable {
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }
}

/// Read a headed CSV file, every column as nullable Utf8.
pub fn read_text_table(path: &Path) -> Result<TextTable, StoreError> {
    let mut file = File::open(path)?;
    let (inferred, _) = Format::default()
        .with_header(true)
        .infer_schema(BufReader::new(&mut file), Some(0))?;
    let headers: Vec<String> = inferred.fields().iter().map(|f| f.name().trim().to_string()).collect();

    file.seek(SeekFrom::Start(0))?;
    let reader = ReaderBuilder::new(Arc::new(text_schema(&headers)))
        .with_header(true)
        .with_batch_size(BATCH_SIZE)
        .build(BufReader::new(file))?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;

    Ok(TextTable { headers, batches })
}

/// Write `batch` with a header row, replacing `path` atomically.
pub fn write_table(path: &Path, batch: &RecordBatch) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = WriterBuilder::new().with_header(true).build(&mut tmp);
        writer.write(batch)?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

/// First column whose header matches one of `names`, ignoring ASCII case.
pub fn find_column<'a>(batch: &'a RecordBatch, names: &[&str]) -> Option<&'a dyn Array> {
    let schema = batch.schema_ref();
    names.iter().find_map(|want| {
        schema
            .fields()
            .iter()
            .position(|f| f.name().eq_ignore_ascii_case(want))
            .map(|i| batch.column(i).as_ref())
    })
}

/// Trimmed string value of a Utf8/LargeUtf8 cell. Null and blank are `None`.
pub fn get_string(col: &dyn Array, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| arr.value(row))
        .or_else(|| {
            col.as_any()
                .downcast_ref::<LargeStringArray>()
                .map(|arr| arr.value(row))
        })
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{StringArray, UInt64Array};
    use arrow::datatypes::{DataType, Field, Schema};
    use tempfile::TempDir;

    fn sample_batch() -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("id", DataType::UInt64, false),
            Field::new("name", DataType::Utf8, true),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(UInt64Array::from(vec![1, 2])),
                Arc::new(StringArray::from(vec![Some("Bath, University of"), None])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn write_then_read_as_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/table.csv");
        write_table(&path, &sample_batch()).unwrap();

        let table = read_text_table(&path).unwrap();
        assert_eq!(table.headers, vec!["id", "name"]);
        assert_eq!(table.num_rows(), 2);

        let batch = &table.batches[0];
        let id = find_column(batch, &["ID"]).unwrap();
        let name = find_column(batch, &["name"]).unwrap();
        assert_eq!(get_string(id, 1).as_deref(), Some("2"));
        assert_eq!(get_string(name, 0).as_deref(), Some("Bath, University of"));
        assert_eq!(get_string(name, 1), None);
    }

    #[test]
    fn header_only_file_has_no_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, "identifier,name\n").unwrap();

        let table = read_text_table(&path).unwrap();
        assert_eq!(table.headers, vec!["identifier", "name"]);
        assert_eq!(table.num_rows(), 0);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = read_text_table(&dir.path().join("nope.csv")).err().unwrap();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn find_column_tries_names_in_order() {
        let batch = sample_batch();
        assert!(find_column(&batch, &["missing", "name"]).is_some());
        assert!(find_column(&batch, &["missing"]).is_none());
    }
}
