//! Base-relative path handling.
//!
//! # Conventions
//!
//! - Stored paths are relative to the base directory and always use `/`.
//! - A path outside the base directory is stored as-is (absolute).
//! - Resolving a stored path joins relative paths onto the base directory.

use std::path::{Component, Path, PathBuf};

use finledger_core::Ledger;
use tracing::warn;

/// `path` relative to `base`, `/`-separated, or `None` when outside `base`.
pub fn relative_to(base: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// The form a path is stored in: base-relative when possible.
pub fn to_stored(base: &Path, path: &Path) -> String {
    relative_to(base, path).unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Turn a stored path back into a filesystem path.
pub fn resolve(base: &Path, stored: &str) -> PathBuf {
    let p = Path::new(stored);
    if p.is_absolute() { p.to_path_buf() } else { base.join(p) }
}

/// What [`relativize`] did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RelativizeReport {
    pub converted: usize,
    /// Absolute paths that are not under the base directory; left unchanged.
    pub outside: Vec<String>,
}

/// Rewrite absolute ledger paths under `base` into base-relative form.
pub fn relativize(ledger: &mut Ledger, base: &Path) -> RelativizeReport {
    let mut outside = Vec::new();
    let converted = ledger.rewrite_paths(|stored| {
        let p = Path::new(stored);
        if !p.is_absolute() {
            return None;
        }
        let rel = relative_to(base, p);
        if rel.is_none() {
            warn!(path = stored, base = %base.display(), "path not within base directory");
            outside.push(stored.to_string());
        }
        rel
    });
    RelativizeReport { converted, outside }
}
