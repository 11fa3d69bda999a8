//! Coverage analysis: which reporting periods are still missing per institution.
//!
//! Everything here works on *start* years. A record with period end `E`
//! contributes start year `E - 1`; a missing start year `S` is reported as
//! the period `S-(S+1)`.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::CoveragePolicy;
use crate::ledger::{InstitutionKey, InstitutionRef, Ledger};
use crate::period::{Period, PeriodEnd};

/// Start years whose period end is a representable 4-digit [`PeriodEnd`].
const START_YEARS: std::ops::RangeInclusive<i32> = 999..=9998;

/// A reporting period with no document behind it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MissingPeriod {
    start: i32,
}

impl MissingPeriod {
    pub fn from_start(start: i32) -> Self {
        Self { start }
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn period(&self) -> Period {
        Period::from_start(self.start)
    }

    /// `"2019-20"`.
    pub fn label(&self) -> String {
        self.period().label()
    }

    pub fn period_end(&self) -> PeriodEnd {
        self.period().period_end()
    }
}

/// Missing start years per institution under the three-part policy.
///
/// # Algorithm
///
/// For each institution with at least one known start year:
/// 1. interior gaps strictly between the earliest and latest known year;
/// 2. forward years from `latest + 1` through `current_year + max_forward - 1`;
/// 3. backward years from `max(earliest - max_lookback, lookback_floor)`
///    through `earliest - 1`.
///
/// Institutions with no known years are left out of the result. Window
/// arithmetic saturates and never leaves the 4-digit year range.
pub fn compute_missing<K: Ord + Clone>(
    known: &BTreeMap<K, BTreeSet<i32>>,
    current_year: i32,
    policy: &CoveragePolicy,
) -> BTreeMap<K, Vec<MissingPeriod>> {
    known
        .iter()
        .filter_map(|(key, years)| {
            let (&earliest, &latest) = (years.first()?, years.last()?);
            let mut missing = BTreeSet::new();

            missing.extend((earliest + 1..latest).filter(|y| !years.contains(y)));
            let forward_end = current_year
                .saturating_add(policy.max_forward)
                .saturating_sub(1)
                .min(*START_YEARS.end());
            missing.extend(latest + 1..=forward_end);
            let floor = earliest
                .saturating_sub(policy.max_lookback)
                .max(policy.lookback_floor)
                .max(*START_YEARS.start());
            missing.extend(floor..earliest);

            let missing = missing.into_iter().map(MissingPeriod::from_start).collect();
            Some((key.clone(), missing))
        })
        .collect()
}

/// Coverage of one institution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageEntry {
    pub key: InstitutionKey,
    pub institution: InstitutionRef,
    /// Start years backed by a document or extract.
    pub known: BTreeSet<i32>,
    pub missing: Vec<MissingPeriod>,
    pub records: usize,
    pub documents: usize,
}

impl CoverageEntry {
    pub fn earliest(&self) -> Option<i32> {
        self.known.first().copied()
    }

    pub fn latest(&self) -> Option<i32> {
        self.known.last().copied()
    }
}

/// Per-institution coverage derived from a ledger. Diagnostic only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageReport {
    pub current_year: i32,
    /// Most missing periods first, then by institution name.
    pub entries: Vec<CoverageEntry>,
}

impl CoverageReport {
    /// Group the ledger by institution and run [`compute_missing`].
    ///
    /// Placeholder records are counted but never make a period known.
    pub fn build(ledger: &Ledger, current_year: i32, policy: &CoveragePolicy) -> Self {
        struct Acc {
            institution: InstitutionRef,
            known: BTreeSet<i32>,
            records: usize,
            documents: usize,
        }

        let mut groups: BTreeMap<InstitutionKey, Acc> = BTreeMap::new();
        for record in ledger.records() {
            let acc = groups.entry(record.key()).or_insert_with(|| Acc {
                institution: record.institution(),
                known: BTreeSet::new(),
                records: 0,
                documents: 0,
            });
            acc.records += 1;
            if record.has_document() {
                acc.documents += 1;
            }
            if !record.is_placeholder() {
                acc.known.insert(record.period_end.start_year());
            }
        }

        let known: BTreeMap<InstitutionKey, BTreeSet<i32>> = groups
            .iter()
            .map(|(k, acc)| (k.clone(), acc.known.clone()))
            .collect();
        let mut missing = compute_missing(&known, current_year, policy);

        let mut entries: Vec<CoverageEntry> = groups
            .into_iter()
            .filter_map(|(key, acc)| {
                let missing = missing.remove(&key)?;
                Some(CoverageEntry {
                    key,
                    institution: acc.institution,
                    known: acc.known,
                    missing,
                    records: acc.records,
                    documents: acc.documents,
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            b.missing
                .len()
                .cmp(&a.missing.len())
                .then_with(|| a.institution.name.cmp(&b.institution.name))
        });

        Self { current_year, entries }
    }

    pub fn get(&self, key: &InstitutionKey) -> Option<&CoverageEntry> {
        self.entries.iter().find(|e| &e.key == key)
    }

    pub fn total_missing(&self) -> usize {
        self.entries.iter().map(|e| e.missing.len()).sum()
    }

    pub fn with_gaps(&self) -> impl Iterator<Item = &CoverageEntry> {
        self.entries.iter().filter(|e| !e.missing.is_empty())
    }

    /// Institutions whose latest known start year is within `window` years of now.
    pub fn recent(&self, window: i32) -> usize {
        self.entries
            .iter()
            .filter(|e| e.latest().is_some_and(|y| y >= self.current_year - window))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Observation;

    fn starts(missing: &[MissingPeriod]) -> Vec<i32> {
        missing.iter().map(MissingPeriod::start).collect()
    }

    fn policy(max_lookback: i32, max_forward: i32) -> CoveragePolicy {
        CoveragePolicy {
            max_lookback,
            max_forward,
            ..CoveragePolicy::default()
        }
    }

    #[test]
    fn interior_forward_and_backward() {
        let known = BTreeMap::from([("inst", BTreeSet::from([2019, 2022]))]);
        let missing = compute_missing(&known, 2024, &policy(3, 2));
        assert_eq!(
            starts(&missing["inst"]),
            vec![2016, 2017, 2018, 2020, 2021, 2023, 2024, 2025]
        );
    }

    #[test]
    fn lookback_is_floored() {
        let known = BTreeMap::from([("inst", BTreeSet::from([2002]))]);
        let missing = compute_missing(&known, 2003, &policy(5, 1));
        assert_eq!(starts(&missing["inst"]), vec![2000, 2001, 2003]);
    }

    #[test]
    fn no_forward_when_latest_is_current() {
        let known = BTreeMap::from([("inst", BTreeSet::from([2020, 2021, 2022, 2023]))]);
        let missing = compute_missing(&known, 2023, &policy(0, 1));
        assert!(missing["inst"].is_empty());
    }

    #[test]
    fn huge_windows_stay_in_year_range() {
        let known = BTreeMap::from([("inst", BTreeSet::from([2020]))]);
        let missing = compute_missing(
            &known,
            2020,
            &CoveragePolicy {
                max_lookback: i32::MAX,
                max_forward: i32::MAX,
                lookback_floor: i32::MIN,
            },
        );
        let starts = starts(&missing["inst"]);
        assert_eq!(starts.first(), Some(&999));
        assert_eq!(starts.last(), Some(&9998));
        assert_eq!(missing["inst"].last().unwrap().period_end().to_string(), "9999");
    }

    #[test]
    fn institutions_without_known_years_are_excluded() {
        let known = BTreeMap::from([("empty", BTreeSet::new()), ("one", BTreeSet::from([2020]))]);
        let missing = compute_missing(&known, 2020, &policy(0, 1));
        assert!(!missing.contains_key("empty"));
        assert!(missing["one"].is_empty());
    }

    #[test]
    fn missing_period_labels() {
        let m = MissingPeriod::from_start(2019);
        assert_eq!(m.label(), "2019-20");
        assert_eq!(m.period_end().to_string(), "2020");
        assert_eq!(MissingPeriod::from_start(1999).label(), "1999-00");
    }

    fn ledger() -> Ledger {
        let mut ledger = Ledger::new();
        let anglia = InstitutionRef::resolved("X1", "Anglia Ruskin University");
        for year in [2020, 2023] {
            ledger.upsert_observation(Observation {
                document_path: Some(format!("documents/anglia_{year}.pdf")),
                ..Observation::new(anglia.clone(), PeriodEnd::new(year).unwrap())
            });
        }
        let bath = InstitutionRef::resolved("X2", "University of Bath");
        ledger.upsert_observation(Observation {
            text_extract_path: Some("extracts/bath.txt".into()),
            ..Observation::new(bath, PeriodEnd::new(2024).unwrap())
        });
        // Only a placeholder: contributes nothing known.
        ledger.add_placeholders(&InstitutionRef::unresolved("Nowhere"), &[PeriodEnd::new(2022).unwrap()]);
        ledger
    }

    #[test]
    fn report_from_ledger() {
        let report = CoverageReport::build(&ledger(), 2024, &policy(1, 1));
        assert_eq!(report.entries.len(), 2);

        let anglia = report.get(&InstitutionKey::Id("X1".into())).unwrap();
        assert_eq!(anglia.known, BTreeSet::from([2019, 2022]));
        assert_eq!(starts(&anglia.missing), vec![2018, 2020, 2021, 2023, 2024]);
        assert_eq!(anglia.documents, 2);

        let bath = report.get(&InstitutionKey::Id("X2".into())).unwrap();
        assert_eq!(bath.documents, 0);
        assert_eq!(starts(&bath.missing), vec![2022, 2024]);

        assert!(report.get(&InstitutionKey::Name("Nowhere".into())).is_none());
        assert_eq!(report.total_missing(), 7);
    }

    #[test]
    fn report_orders_by_missing_then_name() {
        let report = CoverageReport::build(&ledger(), 2024, &policy(1, 1));
        let names: Vec<_> = report.entries.iter().map(|e| e.institution.name.as_str()).collect();
        assert_eq!(names, vec!["Anglia Ruskin University", "University of Bath"]);
        assert_eq!(report.recent(2), 2);
        assert_eq!(report.with_gaps().count(), 2);
    }

    #[test]
    fn placeholders_do_not_change_missing_set() {
        let mut ledger = ledger();
        let before = CoverageReport::build(&ledger, 2024, &policy(1, 1));
        for entry in &before.entries {
            let periods: Vec<_> = entry.missing.iter().map(MissingPeriod::period_end).collect();
            ledger.add_placeholders(&entry.institution, &periods);
        }
        let after = CoverageReport::build(&ledger, 2024, &policy(1, 1));
        assert_eq!(before.total_missing(), after.total_missing());
        let key = InstitutionKey::Id("X1".into());
        assert_eq!(before.get(&key).unwrap().missing, after.get(&key).unwrap().missing);
    }
}
