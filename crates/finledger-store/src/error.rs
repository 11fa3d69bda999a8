use std::path::PathBuf;

use finledger_core::LedgerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to load ledger {path}: {source}")]
    LedgerLoad {
        path: PathBuf,
        #[source]
        source: Box<StoreError>,
    },

    #[error("failed to write ledger {path}: {source}")]
    LedgerWrite {
        path: PathBuf,
        #[source]
        source: Box<StoreError>,
    },

    #[error("ledger {path} is malformed: {detail}")]
    LedgerSchema { path: PathBuf, detail: String },

    #[error("registry {path} could not be loaded: {detail}")]
    RegistryLoad { path: PathBuf, detail: String },

    #[error("invalid ledger contents: {0}")]
    Ledger(#[from] LedgerError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
