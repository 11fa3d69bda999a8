//! Diagnostic coverage snapshot (JSON). Written for humans and dashboards;
//! never read back as ground truth.

use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use finledger_core::{CoverageReport, MissingPeriod, Period};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;

use crate::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageSnapshot {
    pub timestamp: DateTime<Utc>,
    pub iteration: usize,
    pub current_year: i32,
    pub total_missing: usize,
    pub institutions: Vec<InstitutionCoverage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionCoverage {
    pub identifier: Option<String>,
    pub name: String,
    /// Known period labels, `"2019-20"` style, oldest first.
    pub known: Vec<String>,
    pub earliest: Option<String>,
    pub latest: Option<String>,
    pub records: usize,
    pub documents: usize,
    pub missing: Vec<String>,
}

impl CoverageSnapshot {
    pub fn from_report(report: &CoverageReport, iteration: usize, timestamp: DateTime<Utc>) -> Self {
        let label = |start: i32| Period::from_start(start).label();
        let institutions = report
            .entries
            .iter()
            .map(|e| InstitutionCoverage {
                identifier: e.institution.identifier.clone(),
                name: e.institution.name.clone(),
                known: e.known.iter().copied().map(label).collect(),
                earliest: e.earliest().map(label),
                latest: e.latest().map(label),
                records: e.records,
                documents: e.documents,
                missing: e.missing.iter().map(MissingPeriod::label).collect(),
            })
            .collect();

        Self {
            timestamp,
            iteration,
            current_year: report.current_year,
            total_missing: report.total_missing(),
            institutions,
        }
    }

    /// Write as pretty JSON, replacing `path` atomically.
    pub fn write(&self, path: &Path) -> Result<(), StoreError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let tmp = NamedTempFile::new_in(dir)?;
        let mut out = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut out, self)?;
        out.flush()?;
        drop(out);
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;

        info!(path = %path.display(), institutions = self.institutions.len(), "wrote coverage snapshot");
        Ok(())
    }
}
