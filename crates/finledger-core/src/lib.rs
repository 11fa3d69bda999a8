pub mod collect;
pub mod config;
pub mod coverage;
pub mod error;
pub mod filename;
pub mod ledger;
pub mod period;
pub mod plan;
pub mod reconcile;
pub mod registry;

pub use collect::{CollaboratorError, Collector, Extractor, NoExtraction, Retriever};
pub use config::{CoveragePolicy, EngineConfig, MatchConfig, NameParseConfig, PeriodBounds, PlanConfig};
pub use coverage::{CoverageEntry, CoverageReport, MissingPeriod, compute_missing};
pub use error::{ConfigError, LedgerError, ParseError};
pub use filename::{Candidate, parse_file_name};
pub use ledger::{InstitutionKey, InstitutionRef, Ledger, LedgerRecord, Observation, UpsertOutcome};
pub use period::{Period, PeriodEnd, normalize_period, parse_period};
pub use plan::{SearchRequest, plan_searches};
pub use reconcile::{CorpusDocument, Reconciler, Reconciliation, Skipped};
pub use registry::{AliasTable, InstitutionEntry, MatchMethod, Registry, Resolution, normalize_name};
