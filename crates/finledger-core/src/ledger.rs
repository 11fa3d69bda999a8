//! The document ledger: one record per (institution, period) observation.
//!
//! The ledger is append/upsert-only. Records are never deleted and a merge
//! never replaces a populated field with an empty one, so replaying the same
//! observations is a no-op.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::LedgerError;
use crate::period::PeriodEnd;
use crate::registry::Resolution;

/// Grouping key: the registry identifier when resolved, else the display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InstitutionKey {
    Id(String),
    Name(String),
}

impl fmt::Display for InstitutionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstitutionKey::Id(id) => f.write_str(id),
            InstitutionKey::Name(name) => f.write_str(name),
        }
    }
}

/// Who a record is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionRef {
    pub identifier: Option<String>,
    pub name: String,
}

impl InstitutionRef {
    pub fn resolved(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: Some(identifier.into()),
            name: name.into(),
        }
    }

    pub fn unresolved(name: impl Into<String>) -> Self {
        Self {
            identifier: None,
            name: name.into(),
        }
    }

    pub fn from_resolution(resolution: &Resolution) -> Self {
        match resolution {
            Resolution::Matched {
                identifier,
                official_name,
                ..
            } => Self::resolved(identifier.clone(), official_name.clone()),
            Resolution::Unmatched { cleaned_name } => Self::unresolved(cleaned_name.clone()),
        }
    }

    pub fn key(&self) -> InstitutionKey {
        match self.identifier.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => InstitutionKey::Id(id.to_string()),
            None => InstitutionKey::Name(self.name.clone()),
        }
    }
}

/// A freshly observed document (or extract) before it has a ledger id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Observation {
    pub institution: Option<InstitutionRef>,
    pub period_end: Option<PeriodEnd>,
    pub source_url: Option<String>,
    pub download_timestamp: Option<String>,
    pub document_path: Option<String>,
    pub text_extract_path: Option<String>,
    pub structured_extract_path: Option<String>,
}

impl Observation {
    pub fn new(institution: InstitutionRef, period_end: PeriodEnd) -> Self {
        Self {
            institution: Some(institution),
            period_end: Some(period_end),
            ..Self::default()
        }
    }
}

/// One persisted ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub id: u64,
    pub institution_identifier: Option<String>,
    pub institution_name: String,
    pub period_end: PeriodEnd,
    pub source_url: Option<String>,
    pub download_timestamp: Option<String>,
    pub document_path: Option<String>,
    pub text_extract_path: Option<String>,
    pub structured_extract_path: Option<String>,
}

impl LedgerRecord {
    pub fn institution(&self) -> InstitutionRef {
        InstitutionRef {
            identifier: self.institution_identifier.clone(),
            name: self.institution_name.clone(),
        }
    }

    pub fn key(&self) -> InstitutionKey {
        self.institution().key()
    }

    pub fn has_document(&self) -> bool {
        is_set(&self.document_path)
    }

    /// True when nothing has been retrieved for this period yet.
    pub fn is_placeholder(&self) -> bool {
        !self.has_document() && !is_set(&self.text_extract_path) && !is_set(&self.structured_extract_path)
    }

    fn matches(&self, key: &InstitutionKey, period_end: PeriodEnd) -> bool {
        self.period_end == period_end && &self.key() == key
    }
}

/// What an upsert did to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(u64),
    Updated(u64),
    Unchanged(u64),
    /// Empty fields were filled where possible; `fields` already held a
    /// different value and were left alone.
    Conflict { id: u64, fields: Vec<&'static str> },
}

impl UpsertOutcome {
    pub fn id(&self) -> u64 {
        match self {
            UpsertOutcome::Inserted(id)
            | UpsertOutcome::Updated(id)
            | UpsertOutcome::Unchanged(id)
            | UpsertOutcome::Conflict { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    records: Vec<LedgerRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt records loaded from storage. Ids must be unique and non-zero.
    pub fn from_records(records: Vec<LedgerRecord>) -> Result<Self, LedgerError> {
        let mut seen = HashSet::with_capacity(records.len());
        for r in &records {
            if r.id == 0 {
                return Err(LedgerError::ZeroId);
            }
            if !seen.insert(r.id) {
                return Err(LedgerError::DuplicateId(r.id));
            }
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[LedgerRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<LedgerRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&LedgerRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// One greater than the largest id, or 1 when empty.
    pub fn next_id(&self) -> u64 {
        self.records.iter().map(|r| r.id).max().map_or(1, |max| max + 1)
    }

    /// Merge an observation into the record for its (institution, period),
    /// or append a new record when there is none.
    ///
    /// # Algorithm
    ///
    /// 1. Candidates are records with the same key and period end.
    /// 2. The target is the lowest-id candidate holding a document, else the
    ///    lowest-id candidate (an open placeholder).
    /// 3. Each empty field of the target takes the incoming non-empty value.
    ///    A populated field is never overwritten; a differing incoming value
    ///    is reported as a conflict.
    ///
    /// Observations without an institution or period are ignored by callers
    /// before they get here; this returns `None` for them.
    pub fn upsert_observation(&mut self, observation: Observation) -> Option<UpsertOutcome> {
        let (Some(institution), Some(period_end)) = (observation.institution.clone(), observation.period_end) else {
            return None;
        };
        let key = institution.key();

        let target = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.matches(&key, period_end))
            .min_by_key(|(_, r)| (!r.has_document(), r.id))
            .map(|(i, _)| i);

        let Some(index) = target else {
            let id = self.next_id();
            self.records.push(LedgerRecord {
                id,
                institution_identifier: institution.identifier.filter(|s| !s.is_empty()),
                institution_name: institution.name,
                period_end,
                source_url: non_empty(observation.source_url),
                download_timestamp: non_empty(observation.download_timestamp),
                document_path: non_empty(observation.document_path),
                text_extract_path: non_empty(observation.text_extract_path),
                structured_extract_path: non_empty(observation.structured_extract_path),
            });
            debug!(id, key = %key, period_end = %period_end, "ledger insert");
            return Some(UpsertOutcome::Inserted(id));
        };

        let record = &mut self.records[index];
        let mut changed = false;
        let mut conflicts = Vec::new();
        for (name, slot, incoming) in [
            ("source_url", &mut record.source_url, observation.source_url),
            ("download_timestamp", &mut record.download_timestamp, observation.download_timestamp),
            ("document_path", &mut record.document_path, observation.document_path),
            ("text_extract_path", &mut record.text_extract_path, observation.text_extract_path),
            (
                "structured_extract_path",
                &mut record.structured_extract_path,
                observation.structured_extract_path,
            ),
        ] {
            match merge_field(slot, incoming) {
                Merge::Filled => changed = true,
                Merge::Conflict => conflicts.push(name),
                Merge::Kept => {}
            }
        }

        let id = record.id;
        // The download timestamp of an existing document is not a conflict:
        // re-observing the same file at a later time is expected.
        conflicts.retain(|f| *f != "download_timestamp");
        Some(if !conflicts.is_empty() {
            debug!(id, ?conflicts, "ledger merge kept existing values");
            UpsertOutcome::Conflict { id, fields: conflicts }
        } else if changed {
            UpsertOutcome::Updated(id)
        } else {
            UpsertOutcome::Unchanged(id)
        })
    }

    /// Append a placeholder for each period with no record at all for
    /// `institution`. Returns the ids that were appended.
    pub fn add_placeholders(&mut self, institution: &InstitutionRef, periods: &[PeriodEnd]) -> Vec<u64> {
        let key = institution.key();
        let mut added = Vec::new();
        for &period_end in periods {
            if self.records.iter().any(|r| r.matches(&key, period_end)) {
                continue;
            }
            let id = self.next_id();
            self.records.push(LedgerRecord {
                id,
                institution_identifier: institution.identifier.clone().filter(|s| !s.is_empty()),
                institution_name: institution.name.clone(),
                period_end,
                source_url: None,
                download_timestamp: None,
                document_path: None,
                text_extract_path: None,
                structured_extract_path: None,
            });
            added.push(id);
        }
        added
    }

    /// Apply `rewrite` to every stored path. `rewrite` returns the new value
    /// or `None` to leave a path untouched. Returns how many paths changed.
    pub fn rewrite_paths(&mut self, mut rewrite: impl FnMut(&str) -> Option<String>) -> usize {
        let mut changed = 0;
        for record in &mut self.records {
            for slot in [
                &mut record.document_path,
                &mut record.text_extract_path,
                &mut record.structured_extract_path,
            ] {
                if let Some(path) = slot.as_deref()
                    && let Some(new) = rewrite(path)
                    && new != path
                {
                    *slot = Some(new);
                    changed += 1;
                }
            }
        }
        changed
    }
}

enum Merge {
    Filled,
    Kept,
    Conflict,
}

fn merge_field(slot: &mut Option<String>, incoming: Option<String>) -> Merge {
    let Some(incoming) = non_empty(incoming) else {
        return Merge::Kept;
    };
    match slot.as_deref() {
        Some(existing) if !existing.is_empty() => {
            if existing == incoming {
                Merge::Kept
            } else {
                Merge::Conflict
            }
        }
        _ => {
            *slot = Some(incoming);
            Merge::Filled
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}
