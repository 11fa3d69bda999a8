//! Corpus scanning: documents on disk plus the extracts derived from them.
//!
//! Extracts share their document's file stem: `<stem>.txt` is the text
//! extract and `<stem>.json` the structured one. An extract whose document
//! is gone still counts as a corpus entry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use finledger_core::CorpusDocument;
use finledger_core::filename::file_stem;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::StoreError;
use crate::paths::to_stored;

/// Where the corpus lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusLayout {
    /// Stored paths are relative to this.
    pub base_dir: PathBuf,
    pub documents_dir: PathBuf,
    pub extracts_dir: Option<PathBuf>,
    /// Lowercase, without the dot.
    pub document_extensions: Vec<String>,
}

impl CorpusLayout {
    /// `<base>/documents` and `<base>/extracts`, PDFs only.
    pub fn under(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            documents_dir: base_dir.join("documents"),
            extracts_dir: Some(base_dir.join("extracts")),
            base_dir,
            document_extensions: vec!["pdf".to_string()],
        }
    }
}

#[derive(Default)]
struct Extracts {
    text: Option<PathBuf>,
    structured: Option<PathBuf>,
}

/// Scan the corpus into engine input, sorted by file name.
pub fn scan_corpus(layout: &CorpusLayout) -> Result<Vec<CorpusDocument>, StoreError> {
    let documents = list_files(&layout.documents_dir, &layout.document_extensions)?;

    let mut extracts: BTreeMap<String, Extracts> = BTreeMap::new();
    if let Some(dir) = &layout.extracts_dir {
        for path in list_files(dir, &["txt".to_string(), "json".to_string()])? {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let slot = extracts.entry(file_stem(name).to_string()).or_default();
            if has_extension(&path, "txt") {
                slot.text = Some(path);
            } else {
                slot.structured = Some(path);
            }
        }
    }

    let stored = |p: &Option<PathBuf>| p.as_deref().map(|p| to_stored(&layout.base_dir, p));
    let mut corpus = Vec::with_capacity(documents.len());
    for path in &documents {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            warn!(path = %path.display(), "skipping non-UTF-8 file name");
            continue;
        };
        let ex = extracts.remove(file_stem(name)).unwrap_or_default();
        corpus.push(CorpusDocument {
            file_name: name.to_string(),
            document_path: Some(to_stored(&layout.base_dir, path)),
            text_extract_path: stored(&ex.text),
            structured_extract_path: stored(&ex.structured),
            source_url: None,
        });
    }

    let orphans = extracts.len();
    for (stem, ex) in extracts {
        let Some(first) = ex.text.as_ref().or(ex.structured.as_ref()) else {
            continue;
        };
        let file_name = first
            .file_name()
            .and_then(|n| n.to_str())
            .map_or_else(|| stem.clone(), String::from);
        debug!(stem = %stem, "extract without document");
        corpus.push(CorpusDocument {
            file_name,
            document_path: None,
            text_extract_path: stored(&ex.text),
            structured_extract_path: stored(&ex.structured),
            source_url: None,
        });
    }

    corpus.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    info!(documents = documents.len(), orphan_extracts = orphans, "scanned corpus");
    Ok(corpus)
}

/// Regular files under `dir` with one of `extensions`, hidden files excluded.
fn list_files(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, StoreError> {
    if !dir.exists() {
        warn!(dir = %dir.display(), "corpus directory not found");
        return Ok(Vec::new());
    }
    if !dir.is_dir() {
        return Err(StoreError::Other(format!("{} is not a directory", dir.display())));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(dir).follow_links(false).sort_by_file_name();
    for entry in walker {
        match entry {
            Ok(entry) => {
                let hidden = entry.file_name().to_str().is_some_and(|n| n.starts_with('.'));
                if entry.file_type().is_file()
                    && !hidden
                    && extensions.iter().any(|ext| has_extension(entry.path(), ext))
                {
                    files.push(entry.into_path());
                }
            }
            Err(e) => warn!(error = %e, "error reading corpus entry"),
        }
    }
    Ok(files)
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}
