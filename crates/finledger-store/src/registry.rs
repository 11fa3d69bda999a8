//! Reference registry and alias table loading.
//!
//! The registry is advisory: a missing or unreadable file degrades to an
//! empty registry (every fragment then stays unmatched) instead of aborting.

use std::collections::BTreeMap;
use std::path::Path;

use finledger_core::{AliasTable, InstitutionEntry, Registry};
use tracing::{debug, info, warn};

use crate::StoreError;
use crate::tabular::{TextTable, get_string, read_text_table};

const IDENTIFIER_COLUMNS: &[&str] = &["identifier", "ukprn", "id"];
const NAME_COLUMNS: &[&str] = &["name", "official_name", "institution_name", "institution"];

/// Load the registry CSV at `path`.
///
/// Needs an identifier column (`identifier` or `ukprn`) and a name column
/// (`name` or `official_name`); every other column is kept as an attribute.
pub fn load_registry(path: &Path, aliases: AliasTable) -> Result<Registry, StoreError> {
    let registry_error = |detail: String| StoreError::RegistryLoad {
        path: path.to_path_buf(),
        detail,
    };

    let table = read_text_table(path).map_err(|e| registry_error(e.to_string()))?;
    let id_header = pick_header(&table, IDENTIFIER_COLUMNS)
        .ok_or_else(|| registry_error("no identifier column".into()))?;
    let name_header = pick_header(&table, NAME_COLUMNS)
        .ok_or_else(|| registry_error("no name column".into()))?;

    let mut entries = Vec::with_capacity(table.num_rows());
    for batch in &table.batches {
        for row in 0..batch.num_rows() {
            let value = |i: usize| get_string(batch.column(i).as_ref(), row);
            let (Some(identifier), Some(official_name)) = (value(id_header), value(name_header)) else {
                debug!(row, "registry row without identifier or name skipped");
                continue;
            };
            let attributes: BTreeMap<String, String> = table
                .headers
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != id_header && *i != name_header)
                .filter_map(|(i, h)| value(i).map(|v| (h.clone(), v)))
                .collect();
            entries.push(InstitutionEntry {
                identifier,
                official_name,
                attributes,
            });
        }
    }

    let registry = Registry::new(entries, aliases);
    info!(count = registry.len(), path = %path.display(), "loaded registry");
    Ok(registry)
}

/// [`load_registry`], degrading to an empty registry on any failure.
pub fn load_registry_or_empty(path: &Path, aliases: AliasTable) -> Registry {
    if !path.exists() {
        warn!(path = %path.display(), "registry file not found, matching disabled");
        return Registry::empty();
    }
    match load_registry(path, aliases) {
        Ok(registry) => registry,
        Err(error) => {
            warn!(%error, "registry unavailable, matching disabled");
            Registry::empty()
        }
    }
}

/// Load an alias CSV with `alias` and `identifier` columns.
pub fn load_aliases(path: &Path) -> Result<AliasTable, StoreError> {
    let table = read_text_table(path)?;
    let alias_col = pick_header(&table, &["alias"])
        .ok_or_else(|| StoreError::Other(format!("{}: no alias column", path.display())))?;
    let id_col = pick_header(&table, IDENTIFIER_COLUMNS)
        .ok_or_else(|| StoreError::Other(format!("{}: no identifier column", path.display())))?;

    let mut pairs = Vec::new();
    for batch in &table.batches {
        for row in 0..batch.num_rows() {
            if let Some(alias) = get_string(batch.column(alias_col).as_ref(), row)
                && let Some(identifier) = get_string(batch.column(id_col).as_ref(), row)
            {
                pairs.push((alias, identifier));
            }
        }
    }

    let table = AliasTable::from_pairs(pairs);
    info!(count = table.len(), path = %path.display(), "loaded alias table");
    Ok(table)
}

fn pick_header(table: &TextTable, candidates: &[&str]) -> Option<usize> {
    candidates
        .iter()
        .find_map(|want| table.headers.iter().position(|h| h.eq_ignore_ascii_case(want)))
}
