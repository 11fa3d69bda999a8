//! Arrow schemas for the tabular files.

use arrow::datatypes::{DataType, Field, Schema};

/// Ledger column names, in file order.
pub mod ledger_columns {
    pub const ID: &str = "id";
    pub const INSTITUTION_IDENTIFIER: &str = "institution_identifier";
    pub const INSTITUTION_NAME: &str = "institution_name";
    pub const PERIOD_END: &str = "period_end";
    pub const SOURCE_URL: &str = "source_url";
    pub const DOWNLOAD_TIMESTAMP: &str = "download_timestamp";
    pub const DOCUMENT_PATH: &str = "document_path";
    pub const TEXT_EXTRACT_PATH: &str = "text_extract_path";
    pub const STRUCTURED_EXTRACT_PATH: &str = "structured_extract_path";

    pub const ALL: [&str; 9] = [
        ID,
        INSTITUTION_IDENTIFIER,
        INSTITUTION_NAME,
        PERIOD_END,
        SOURCE_URL,
        DOWNLOAD_TIMESTAMP,
        DOCUMENT_PATH,
        TEXT_EXTRACT_PATH,
        STRUCTURED_EXTRACT_PATH,
    ];
}

/// Schema the ledger is written with.
pub fn ledger_schema() -> Schema {
    use ledger_columns::*;
    Schema::new(vec![
        Field::new(ID, DataType::UInt64, false),
        Field::new(INSTITUTION_IDENTIFIER, DataType::Utf8, true),
        Field::new(INSTITUTION_NAME, DataType::Utf8, false),
        Field::new(PERIOD_END, DataType::Utf8, false),
        Field::new(SOURCE_URL, DataType::Utf8, true),
        Field::new(DOWNLOAD_TIMESTAMP, DataType::Utf8, true),
        Field::new(DOCUMENT_PATH, DataType::Utf8, true),
        Field::new(TEXT_EXTRACT_PATH, DataType::Utf8, true),
        Field::new(STRUCTURED_EXTRACT_PATH, DataType::Utf8, true),
    ])
}

/// All-text schema for reading a CSV whose header is `names`.
///
/// Values are parsed by the caller, so a bad cell becomes a row-level
/// error with context instead of a batch-level Arrow cast failure.
pub fn text_schema<S: AsRef<str>>(names: &[S]) -> Schema {
    Schema::new(
        names
            .iter()
            .map(|n| Field::new(n.as_ref(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_schema_matches_column_list() {
        let schema = ledger_schema();
        let names: Vec<_> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, ledger_columns::ALL);
        assert_eq!(schema.field_with_name("id").unwrap().data_type(), &DataType::UInt64);
    }

    #[test]
    fn text_schema_is_nullable_utf8() {
        let schema = text_schema(&["ukprn", "name"]);
        assert_eq!(schema.fields().len(), 2);
        assert!(schema.fields().iter().all(|f| f.is_nullable() && f.data_type() == &DataType::Utf8));
    }
}
