//! Iterative collection: reconcile, plan, retrieve, extract, reconcile again.
//!
//! Retrieval and extraction live outside the engine. They plug in through
//! [`Retriever`] and [`Extractor`]; the engine only ever sees the file names
//! and paths they hand back.

use std::collections::HashSet;

use thiserror::Error;
use tracing::{info, warn};

use crate::ledger::Ledger;
use crate::plan::{SearchRequest, plan_searches};
use crate::reconcile::{CorpusDocument, Reconciler, Reconciliation};

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("retrieval failed: {0}")]
    Retrieval(String),

    #[error("extraction failed: {0}")]
    Extraction(String),
}

/// A file a retriever saved into the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedDocument {
    /// Must follow the corpus naming convention so it parses back.
    pub file_name: String,
    pub document_path: String,
    pub source_url: Option<String>,
}

/// Derived files written for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFiles {
    pub text_extract_path: Option<String>,
    pub structured_extract_path: Option<String>,
}

/// Finds and saves documents for a search request.
pub trait Retriever {
    fn retrieve(&mut self, request: &SearchRequest) -> Result<Vec<RetrievedDocument>, CollaboratorError>;
}

/// Produces text/structured extracts for a saved document.
pub trait Extractor {
    fn extract(&mut self, document: &CorpusDocument) -> Result<ExtractedFiles, CollaboratorError>;
}

/// Extractor that never produces anything.
pub struct NoExtraction;

impl Extractor for NoExtraction {
    fn extract(&mut self, _document: &CorpusDocument) -> Result<ExtractedFiles, CollaboratorError> {
        Ok(ExtractedFiles::default())
    }
}

/// What a collection run did.
#[derive(Debug)]
pub struct CollectionRun {
    /// Iterations that retrieved at least one new document.
    pub iterations: usize,
    pub retrieved: usize,
    pub extracted: usize,
    pub failures: usize,
    /// The corpus after all retrievals, de-duplicated by document path.
    pub corpus: Vec<CorpusDocument>,
    /// The final reconciliation pass.
    pub last: Reconciliation,
}

pub struct Collector<'a, R, E> {
    reconciler: Reconciler<'a>,
    retriever: R,
    extractor: E,
}

impl<'a, R: Retriever, E: Extractor> Collector<'a, R, E> {
    pub fn new(reconciler: Reconciler<'a>, retriever: R, extractor: E) -> Self {
        Self {
            reconciler,
            retriever,
            extractor,
        }
    }

    /// Run up to `max_iterations` rounds of gap filling.
    ///
    /// Stops early when nothing is missing, nothing is planned, or an
    /// iteration brings back no new documents. Collaborator failures are
    /// logged and counted per request; they never end the run.
    pub fn run(
        &mut self,
        ledger: &mut Ledger,
        corpus: Vec<CorpusDocument>,
        current_year: i32,
        observed_at: &str,
    ) -> CollectionRun {
        let mut seen = HashSet::new();
        let mut corpus: Vec<CorpusDocument> = corpus
            .into_iter()
            .filter(|d| d.document_path.as_ref().is_none_or(|p| seen.insert(p.clone())))
            .collect();

        let plan_config = self.reconciler.config().plan;
        let mut last = self.reconciler.reconcile(ledger, &corpus, current_year, observed_at);
        let mut run = RunCounts::default();

        for iteration in 1..=plan_config.max_iterations {
            if last.coverage.total_missing() == 0 {
                info!(iteration, "nothing missing");
                break;
            }
            let requests = plan_searches(&last.coverage, &plan_config);
            if requests.is_empty() {
                break;
            }

            let mut fresh = Vec::new();
            for request in &requests {
                match self.retriever.retrieve(request) {
                    Ok(documents) => {
                        for d in documents {
                            if seen.insert(d.document_path.clone()) {
                                fresh.push(CorpusDocument {
                                    file_name: d.file_name,
                                    document_path: Some(d.document_path),
                                    source_url: d.source_url,
                                    ..CorpusDocument::default()
                                });
                            }
                        }
                    }
                    Err(error) => {
                        warn!(query = %request.query, %error, "retrieval failed");
                        run.failures += 1;
                    }
                }
            }

            if fresh.is_empty() {
                info!(iteration, requests = requests.len(), "no new documents retrieved");
                break;
            }
            run.retrieved += fresh.len();

            for doc in &mut fresh {
                match self.extractor.extract(doc) {
                    Ok(files) => {
                        if files.text_extract_path.is_some() || files.structured_extract_path.is_some() {
                            run.extracted += 1;
                        }
                        doc.text_extract_path = files.text_extract_path;
                        doc.structured_extract_path = files.structured_extract_path;
                    }
                    Err(error) => {
                        warn!(file = %doc.file_name, %error, "extraction failed");
                        run.failures += 1;
                    }
                }
            }

            info!(iteration, retrieved = fresh.len(), "iteration complete");
            corpus.extend(fresh);
            last = self.reconciler.reconcile(ledger, &corpus, current_year, observed_at);
            run.iterations = iteration;
        }

        CollectionRun {
            iterations: run.iterations,
            retrieved: run.retrieved,
            extracted: run.extracted,
            failures: run.failures,
            corpus,
            last,
        }
    }
}

#[derive(Default)]
struct RunCounts {
    iterations: usize,
    retrieved: usize,
    extracted: usize,
    failures: usize,
}
