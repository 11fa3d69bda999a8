use thiserror::Error;

/// Per-document failures. Never fatal: the coordinator records them and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no recognisable reporting period in {token:?}")]
    UnparsablePeriod { token: String },

    #[error("no institution name could be isolated from {stem:?}")]
    Unresolvable { stem: String },
}

/// Engine settings that cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// Structural problems with a ledger handed to [`Ledger::from_records`](crate::Ledger::from_records).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("duplicate ledger id {0}")]
    DuplicateId(u64),

    #[error("ledger id 0 is reserved")]
    ZeroId,
}
