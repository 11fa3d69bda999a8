//! Reference registry of the target institutions and fuzzy name resolution.
//!
//! The registry is built once per run and shared by reference. Resolution
//! runs four stages and the first hit wins:
//!
//! 1. manual alias table (abbreviations, historic mergers)
//! 2. exact match on the normalised name
//! 3. word-boundary containment either way; a one-word contained side
//!    must be unique to a single registry name
//! 4. token overlap, `|A ∩ B| / max(|A|, |B|)`
//!
//! Ties go to the earliest registry entry. That favours precision and
//! predictability over finding the best possible candidate.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::MatchConfig;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static pattern"));

/// Words that carry no identity in institution names.
const STOP_WORDS: &[&str] = &["the", "of", "and", "university", "univ", "uni", "college"];

/// Built-in aliases: alias → registry identifier (UKPRN). Normalised on load.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("royal holloway", "10005553"),
    ("rhul", "10005553"),
    ("lse", "10004063"),
    ("london school of economics", "10004063"),
    ("ucl", "10007784"),
    ("institute of education", "10007784"),
    ("imperial", "10003270"),
    ("imperial college london", "10003270"),
    ("kcl", "10003645"),
    ("king's college london", "10003645"),
];

/// One institution from the reference registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionEntry {
    pub identifier: String,
    pub official_name: String,
    /// Classification columns (country, region, ...) carried through untouched.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl InstitutionEntry {
    pub fn new(identifier: impl Into<String>, official_name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            official_name: official_name.into(),
            attributes: BTreeMap::new(),
        }
    }
}

/// How a fragment was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchMethod {
    Alias,
    Exact,
    Substring,
    TokenOverlap,
}

/// Result of resolving a name fragment against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Matched {
        identifier: String,
        official_name: String,
        method: MatchMethod,
    },
    /// No registry entry cleared the bar; `cleaned_name` stands in as the key.
    Unmatched { cleaned_name: String },
}

impl Resolution {
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Resolution::Matched { identifier, .. } => Some(identifier),
            Resolution::Unmatched { .. } => None,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Resolution::Matched { official_name, .. } => official_name,
            Resolution::Unmatched { cleaned_name } => cleaned_name,
        }
    }
}

/// Manual alias table keyed by normalised alias.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    map: HashMap<String, String>,
}

impl AliasTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        Self::from_pairs(BUILTIN_ALIASES.iter().map(|(a, id)| (*a, *id)))
    }

    /// Aliases are normalised on insert; later duplicates are ignored.
    pub fn from_pairs<A, I>(pairs: impl IntoIterator<Item = (A, I)>) -> Self
    where
        A: AsRef<str>,
        I: Into<String>,
    {
        let mut map = HashMap::new();
        for (alias, identifier) in pairs {
            let key = normalize_name(alias.as_ref());
            if key.is_empty() {
                continue;
            }
            map.entry(key).or_insert_with(|| identifier.into());
        }
        Self { map }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn lookup(&self, normalized: &str) -> Option<&str> {
        self.map.get(normalized).map(String::as_str)
    }
}

struct IndexedEntry {
    entry: InstitutionEntry,
    normalized: String,
    tokens: BTreeSet<String>,
}

/// The reference registry, indexed for resolution.
pub struct Registry {
    entries: Vec<IndexedEntry>,
    by_id: HashMap<String, usize>,
    /// Number of entries whose normalised name has each token.
    token_counts: HashMap<String, usize>,
    aliases: AliasTable,
}

impl Registry {
    /// Index `entries`; a repeated identifier keeps its first entry.
    pub fn new(entries: Vec<InstitutionEntry>, aliases: AliasTable) -> Self {
        let mut indexed = Vec::with_capacity(entries.len());
        let mut by_id = HashMap::with_capacity(entries.len());
        let mut token_counts: HashMap<String, usize> = HashMap::new();
        for entry in entries {
            if by_id.contains_key(&entry.identifier) {
                warn!(identifier = %entry.identifier, "duplicate registry identifier ignored");
                continue;
            }
            let normalized = normalize_name(&entry.official_name);
            let tokens: BTreeSet<String> = normalized.split_whitespace().map(String::from).collect();
            for token in &tokens {
                *token_counts.entry(token.clone()).or_insert(0) += 1;
            }
            by_id.insert(entry.identifier.clone(), indexed.len());
            indexed.push(IndexedEntry {
                entry,
                normalized,
                tokens,
            });
        }
        Self {
            entries: indexed,
            by_id,
            token_counts,
            aliases,
        }
    }

    /// An empty registry: every resolution comes back unmatched.
    pub fn empty() -> Self {
        Self::new(Vec::new(), AliasTable::empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, identifier: &str) -> Option<&InstitutionEntry> {
        self.by_id.get(identifier).map(|&i| &self.entries[i].entry)
    }

    pub fn entries(&self) -> impl Iterator<Item = &InstitutionEntry> {
        self.entries.iter().map(|e| &e.entry)
    }

    /// Resolve a raw name fragment to a registry entry.
    ///
    /// Aliases only resolve to identifiers that exist in the registry, so
    /// an empty registry never matches anything.
    pub fn resolve(&self, fragment: &str, config: &MatchConfig) -> Resolution {
        let normalized = normalize_name(fragment);
        if normalized.is_empty() {
            return self.unmatched(fragment);
        }

        if let Some(i) = self.aliases.lookup(&normalized).and_then(|id| self.by_id.get(id)) {
            return self.matched(*i, MatchMethod::Alias);
        }

        if let Some(i) = self.entries.iter().position(|e| e.normalized == normalized) {
            return self.matched(i, MatchMethod::Exact);
        }

        let padded = format!(" {normalized} ");
        if let Some(i) = self.entries.iter().position(|e| {
            if e.normalized.is_empty() {
                return false;
            }
            let other = format!(" {} ", e.normalized);
            (other.contains(&padded) && self.distinctive(&normalized))
                || (padded.contains(&other) && self.distinctive(&e.normalized))
        }) {
            return self.matched(i, MatchMethod::Substring);
        }

        let tokens: BTreeSet<&str> = normalized.split_whitespace().collect();
        let mut best: Option<(usize, f64)> = None;
        for (i, e) in self.entries.iter().enumerate() {
            let shared = e.tokens.iter().filter(|t| tokens.contains(t.as_str())).count();
            if shared < config.min_shared_tokens {
                continue;
            }
            let score = shared as f64 / tokens.len().max(e.tokens.len()) as f64;
            if score > config.min_score && best.is_none_or(|(_, s)| score > s) {
                best = Some((i, score));
            }
        }
        if let Some((i, score)) = best {
            debug!(fragment, candidate = %self.entries[i].entry.official_name, score, "token-overlap match");
            return self.matched(i, MatchMethod::TokenOverlap);
        }

        self.unmatched(fragment)
    }

    /// A contained name identifies one entry: several words, or a word no
    /// other registry name uses ("london" alone does not).
    fn distinctive(&self, normalized: &str) -> bool {
        let mut words = normalized.split_whitespace();
        match (words.next(), words.next()) {
            (Some(word), None) => self.token_counts.get(word).is_some_and(|&n| n == 1),
            (Some(_), Some(_)) => true,
            (None, _) => false,
        }
    }

    fn matched(&self, index: usize, method: MatchMethod) -> Resolution {
        let entry = &self.entries[index].entry;
        Resolution::Matched {
            identifier: entry.identifier.clone(),
            official_name: entry.official_name.clone(),
            method,
        }
    }

    fn unmatched(&self, fragment: &str) -> Resolution {
        Resolution::Unmatched {
            cleaned_name: clean_name(fragment),
        }
    }
}

/// Canonical comparison form of an institution name.
///
/// Lowercased, apostrophes dropped, `&` read as "and", other punctuation
/// turned into spaces, "of london" removed, then [`STOP_WORDS`] removed.
pub fn normalize_name(name: &str) -> String {
    let lower = name
        .to_lowercase()
        .replace(['\'', '\u{2019}'], "")
        .replace('&', " and ");
    let spaced = NON_ALNUM.replace_all(&lower, " ");
    let collapsed = format!(" {} ", spaced.split_whitespace().collect::<Vec<_>>().join(" "));
    let without_london = collapsed.replace(" of london ", " ");

    without_london
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Best-effort display name for a fragment that did not resolve.
pub fn clean_name(fragment: &str) -> String {
    fragment
        .split(|c: char| c.is_whitespace() || c == '_')
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
