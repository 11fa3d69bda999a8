//! Search planning: turn a coverage report into prioritised search requests.

use crate::config::PlanConfig;
use crate::coverage::{CoverageReport, MissingPeriod};
use crate::ledger::InstitutionRef;

/// Phrases tried in order; the first is the primary query.
const DOCUMENT_PHRASES: &[&str] = &["annual report", "financial statements", "accounts"];

/// One (institution, period) a retriever should look for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub institution: InstitutionRef,
    pub period: MissingPeriod,
    /// `"<name>" <label> "annual report"`.
    pub query: String,
}

impl SearchRequest {
    pub fn new(institution: InstitutionRef, period: MissingPeriod) -> Self {
        let query = query_for(&institution.name, &period, DOCUMENT_PHRASES[0]);
        Self {
            institution,
            period,
            query,
        }
    }

    /// Fallback queries with other document phrasings.
    pub fn alternates(&self) -> Vec<String> {
        DOCUMENT_PHRASES[1..]
            .iter()
            .map(|phrase| query_for(&self.institution.name, &self.period, phrase))
            .collect()
    }
}

fn query_for(name: &str, period: &MissingPeriod, phrase: &str) -> String {
    format!("\"{name}\" {} \"{phrase}\"", period.label())
}

/// Plan the next batch of searches.
///
/// Institutions are taken in report order (most missing first), up to
/// `institutions_per_iteration`; each contributes its earliest
/// `periods_per_institution` missing periods.
pub fn plan_searches(report: &CoverageReport, config: &PlanConfig) -> Vec<SearchRequest> {
    report
        .with_gaps()
        .take(config.institutions_per_iteration)
        .flat_map(|entry| {
            entry
                .missing
                .iter()
                .take(config.periods_per_institution)
                .map(move |&period| SearchRequest::new(entry.institution.clone(), period))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::coverage::CoverageEntry;

    fn entry(name: &str, missing: &[i32]) -> CoverageEntry {
        let institution = InstitutionRef::unresolved(name);
        CoverageEntry {
            key: institution.key(),
            institution,
            known: BTreeSet::from([2020]),
            missing: missing.iter().copied().map(MissingPeriod::from_start).collect(),
            records: 1,
            documents: 1,
        }
    }

    fn report() -> CoverageReport {
        CoverageReport {
            current_year: 2024,
            entries: vec![
                entry("Alpha", &[2016, 2017, 2018, 2019]),
                entry("Beta", &[2021, 2022]),
                entry("Gamma", &[]),
            ],
        }
    }

    #[test]
    fn query_text() {
        let req = SearchRequest::new(InstitutionRef::unresolved("University of Bath"), MissingPeriod::from_start(2022));
        assert_eq!(req.query, r#""University of Bath" 2022-23 "annual report""#);
        assert_eq!(
            req.alternates(),
            vec![
                r#""University of Bath" 2022-23 "financial statements""#.to_string(),
                r#""University of Bath" 2022-23 "accounts""#.to_string(),
            ]
        );
    }

    #[test]
    fn plan_caps_periods_per_institution() {
        let plan = plan_searches(&report(), &PlanConfig::default());
        let got: Vec<_> = plan
            .iter()
            .map(|r| (r.institution.name.as_str(), r.period.start()))
            .collect();
        assert_eq!(
            got,
            vec![("Alpha", 2016), ("Alpha", 2017), ("Alpha", 2018), ("Beta", 2021), ("Beta", 2022)]
        );
    }

    #[test]
    fn plan_caps_institutions() {
        let config = PlanConfig {
            institutions_per_iteration: 1,
            ..PlanConfig::default()
        };
        let plan = plan_searches(&report(), &config);
        assert!(plan.iter().all(|r| r.institution.name == "Alpha"));
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn nothing_missing_plans_nothing() {
        let report = CoverageReport {
            current_year: 2024,
            entries: vec![entry("Gamma", &[])],
        };
        assert!(plan_searches(&report, &PlanConfig::default()).is_empty());
    }
}
