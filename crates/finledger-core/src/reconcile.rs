//! Reconciliation coordinator: corpus + ledger → updated ledger + coverage.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ParseError;
use crate::config::EngineConfig;
use crate::coverage::{CoverageReport, MissingPeriod};
use crate::filename::parse_file_name;
use crate::ledger::{InstitutionRef, Ledger, Observation, UpsertOutcome};
use crate::period::parse_period;
use crate::registry::{Registry, Resolution};

/// One file in the corpus, as seen by the engine: a name and some paths.
///
/// `file_name` is what gets parsed. For an extract with no matching
/// document it is the extract's own file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusDocument {
    pub file_name: String,
    pub document_path: Option<String>,
    pub text_extract_path: Option<String>,
    pub structured_extract_path: Option<String>,
    pub source_url: Option<String>,
}

impl CorpusDocument {
    pub fn document(file_name: impl Into<String>, document_path: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            document_path: Some(document_path.into()),
            ..Self::default()
        }
    }
}

/// A corpus entry that could not become a ledger observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub file_name: String,
    pub error: ParseError,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub upserts: Vec<UpsertOutcome>,
    pub skipped: Vec<Skipped>,
    /// Cleaned names of fragments that did not resolve against the registry.
    pub unmatched: BTreeSet<String>,
    /// Coverage as it stood after upserts, before placeholders were added.
    pub coverage: CoverageReport,
    pub placeholders_added: usize,
}

impl Reconciliation {
    pub fn inserted(&self) -> usize {
        self.count(|o| matches!(o, UpsertOutcome::Inserted(_)))
    }

    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, UpsertOutcome::Updated(_)))
    }

    pub fn conflicts(&self) -> usize {
        self.count(|o| matches!(o, UpsertOutcome::Conflict { .. }))
    }

    fn count(&self, f: impl Fn(&UpsertOutcome) -> bool) -> usize {
        self.upserts.iter().filter(|o| f(o)).count()
    }
}

/// Runs the parse → resolve → upsert → coverage → placeholder pipeline.
pub struct Reconciler<'a> {
    registry: &'a Registry,
    config: &'a EngineConfig,
}

impl<'a> Reconciler<'a> {
    pub fn new(registry: &'a Registry, config: &'a EngineConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    /// Turn one corpus entry into an observation.
    ///
    /// `observed_at` becomes the download timestamp when the entry carries a document.
    pub fn observe(&self, doc: &CorpusDocument, observed_at: &str) -> Result<(Observation, Resolution), ParseError> {
        let candidate = parse_file_name(&doc.file_name, &self.config.names)?;
        let period = parse_period(&candidate.period_token, &self.config.periods)?;
        let resolution = self.registry.resolve(&candidate.name_fragment, &self.config.matching);

        let observation = Observation {
            institution: Some(InstitutionRef::from_resolution(&resolution)),
            period_end: Some(period.period_end()),
            source_url: doc.source_url.clone(),
            download_timestamp: doc.document_path.as_ref().map(|_| observed_at.to_string()),
            document_path: doc.document_path.clone(),
            text_extract_path: doc.text_extract_path.clone(),
            structured_extract_path: doc.structured_extract_path.clone(),
        };
        Ok((observation, resolution))
    }

    /// Reconcile `corpus` into `ledger`.
    ///
    /// # Algorithm
    ///
    /// 1. Parse and resolve every corpus entry; failures are collected, not fatal.
    /// 2. Upsert every observation.
    /// 3. Build coverage from the updated ledger.
    /// 4. Add placeholders for each missing period.
    ///
    /// Placeholders come strictly after the upserts so a period present
    /// under a name variant is never reported missing.
    pub fn reconcile(
        &self,
        ledger: &mut Ledger,
        corpus: &[CorpusDocument],
        current_year: i32,
        observed_at: &str,
    ) -> Reconciliation {
        let mut skipped = Vec::new();
        let mut unmatched = BTreeSet::new();
        let mut observations = Vec::with_capacity(corpus.len());

        for doc in corpus {
            match self.observe(doc, observed_at) {
                Ok((observation, resolution)) => {
                    if let Resolution::Unmatched { cleaned_name } = resolution {
                        unmatched.insert(cleaned_name);
                    }
                    observations.push(observation);
                }
                Err(error) => {
                    debug!(file = %doc.file_name, %error, "skipping corpus entry");
                    skipped.push(Skipped {
                        file_name: doc.file_name.clone(),
                        error,
                    });
                }
            }
        }

        let upserts: Vec<UpsertOutcome> = observations
            .into_iter()
            .filter_map(|o| ledger.upsert_observation(o))
            .collect();

        let coverage = CoverageReport::build(ledger, current_year, &self.config.coverage);

        let mut placeholders_added = 0;
        for entry in &coverage.entries {
            let periods: Vec<_> = entry.missing.iter().map(MissingPeriod::period_end).collect();
            placeholders_added += ledger.add_placeholders(&entry.institution, &periods).len();
        }

        let result = Reconciliation {
            upserts,
            skipped,
            unmatched,
            coverage,
            placeholders_added,
        };
        info!(
            documents = corpus.len(),
            inserted = result.inserted(),
            updated = result.updated(),
            conflicts = result.conflicts(),
            skipped = result.skipped.len(),
            unmatched = result.unmatched.len(),
            placeholders = placeholders_added,
            "reconciled corpus"
        );
        result
    }
}
