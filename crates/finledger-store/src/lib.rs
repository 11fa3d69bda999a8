//! Storage layer: CSV ledger and registry files (through Arrow), corpus
//! scanning, base-relative paths and coverage snapshots.

mod error;
pub use error::StoreError;

pub mod corpus;
pub mod ledger;
pub mod paths;
pub mod registry;
pub mod schema;
pub mod snapshot;
pub mod tabular;

pub use corpus::{CorpusLayout, scan_corpus};
pub use ledger::{load_ledger, save_ledger};
pub use paths::{RelativizeReport, relativize};
pub use registry::{load_aliases, load_registry, load_registry_or_empty};
pub use snapshot::CoverageSnapshot;
