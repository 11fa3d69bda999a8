//! Ledger persistence: one CSV file, fully rewritten on every save.
//!
//! A missing file is an empty ledger. Anything else that goes wrong while
//! loading or saving is fatal and surfaces as [`StoreError::LedgerLoad`] or
//! [`StoreError::LedgerWrite`].

use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray, UInt64Array};
use arrow::record_batch::RecordBatch;
use finledger_core::{Ledger, LedgerRecord, PeriodEnd};
use tracing::info;

use crate::StoreError;
use crate::schema::{ledger_columns as col, ledger_schema};
use crate::tabular::{TextTable, find_column, get_string, read_text_table, write_table};

/// Load the ledger at `path`; a missing file yields an empty ledger.
pub fn load_ledger(path: &Path) -> Result<Ledger, StoreError> {
    let wrap = |source: StoreError| StoreError::LedgerLoad {
        path: path.to_path_buf(),
        source: Box::new(source),
    };
    if !path.try_exists().map_err(|e| wrap(e.into()))? {
        info!(path = %path.display(), "no ledger file yet, starting empty");
        return Ok(Ledger::new());
    }

    let table = read_text_table(path).map_err(wrap)?;
    let records = records_from_table(path, &table).map_err(wrap)?;
    let ledger = Ledger::from_records(records).map_err(|e| wrap(e.into()))?;

    info!(count = ledger.len(), path = %path.display(), "loaded ledger");
    Ok(ledger)
}

/// Rewrite the ledger file in full.
pub fn save_ledger(path: &Path, ledger: &Ledger) -> Result<(), StoreError> {
    let wrap = |source: StoreError| StoreError::LedgerWrite {
        path: path.to_path_buf(),
        source: Box::new(source),
    };
    let batch = ledger_batch(ledger.records()).map_err(wrap)?;
    write_table(path, &batch).map_err(wrap)?;

    info!(count = ledger.len(), path = %path.display(), "saved ledger");
    Ok(())
}

/// Build the on-disk batch for `records`.
pub fn ledger_batch(records: &[LedgerRecord]) -> Result<RecordBatch, StoreError> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from_iter_values(records.iter().map(|r| r.id))),
        text_column(records, |r| r.institution_identifier.as_deref()),
        text_column(records, |r| Some(r.institution_name.as_str())),
        Arc::new(
            records
                .iter()
                .map(|r| Some(r.period_end.to_string()))
                .collect::<StringArray>(),
        ),
        text_column(records, |r| r.source_url.as_deref()),
        text_column(records, |r| r.download_timestamp.as_deref()),
        text_column(records, |r| r.document_path.as_deref()),
        text_column(records, |r| r.text_extract_path.as_deref()),
        text_column(records, |r| r.structured_extract_path.as_deref()),
    ];

    Ok(RecordBatch::try_new(Arc::new(ledger_schema()), columns)?)
}

fn text_column<'a>(records: &'a [LedgerRecord], value: impl Fn(&'a LedgerRecord) -> Option<&'a str>) -> ArrayRef {
    Arc::new(records.iter().map(value).collect::<StringArray>())
}

/// Accepted header spellings per column; the camelCase forms are legacy.
fn aliases(column: &str) -> &'static [&'static str] {
    match column {
        col::ID => &["id"],
        col::INSTITUTION_IDENTIFIER => &["institution_identifier", "institutionIdentifier"],
        col::INSTITUTION_NAME => &["institution_name", "institutionName"],
        col::PERIOD_END => &["period_end", "periodEnd"],
        col::SOURCE_URL => &["source_url", "sourceUrl"],
        col::DOWNLOAD_TIMESTAMP => &["download_timestamp", "downloadTimestamp"],
        col::DOCUMENT_PATH => &["document_path", "documentPath"],
        col::TEXT_EXTRACT_PATH => &["text_extract_path", "textExtractPath"],
        col::STRUCTURED_EXTRACT_PATH => &["structured_extract_path", "structuredExtractPath"],
        _ => &[],
    }
}

fn records_from_table(path: &Path, table: &TextTable) -> Result<Vec<LedgerRecord>, StoreError> {
    let schema_error = |detail: String| StoreError::LedgerSchema {
        path: path.to_path_buf(),
        detail,
    };

    for required in [col::ID, col::INSTITUTION_NAME, col::PERIOD_END] {
        let present = aliases(required)
            .iter()
            .any(|a| table.headers.iter().any(|h| h.eq_ignore_ascii_case(a)));
        if !present {
            return Err(schema_error(format!("missing column {required:?}")));
        }
    }

    let mut records = Vec::with_capacity(table.num_rows());
    let mut line = 1; // header
    for batch in &table.batches {
        let cell = |name: &str, row: usize| find_column(batch, aliases(name)).and_then(|c| get_string(c, row));

        for row in 0..batch.num_rows() {
            line += 1;
            let id = cell(col::ID, row)
                .and_then(|v| v.parse::<u64>().ok())
                .ok_or_else(|| schema_error(format!("line {line}: missing or invalid id")))?;
            let institution_name = cell(col::INSTITUTION_NAME, row)
                .ok_or_else(|| schema_error(format!("line {line}: missing institution name")))?;
            let period_end = cell(col::PERIOD_END, row)
                .ok_or_else(|| schema_error(format!("line {line}: missing period end")))?
                .parse::<PeriodEnd>()
                .map_err(|e| schema_error(format!("line {line}: {e}")))?;

            records.push(LedgerRecord {
                id,
                institution_identifier: cell(col::INSTITUTION_IDENTIFIER, row),
                institution_name,
                period_end,
                source_url: cell(col::SOURCE_URL, row),
                download_timestamp: cell(col::DOWNLOAD_TIMESTAMP, row),
                document_path: cell(col::DOCUMENT_PATH, row),
                text_extract_path: cell(col::TEXT_EXTRACT_PATH, row),
                structured_extract_path: cell(col::STRUCTURED_EXTRACT_PATH, row),
            });
        }
    }
    Ok(records)
}
