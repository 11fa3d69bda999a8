//! Reporting-period normalisation for financial-year tokens in file names.
//!
//! Converts free-form tokens ("2023-24", "2023_2024", "FS2023", "accounts1920")
//! into a [`Period`] whose canonical form is the 4-digit year in which the
//! period ends.
//!
//! # Naming conventions seen in the wild
//!
//! - Range: `2023-24`, `2023_2024`, `annual-report-2022-23`
//! - Compact pair after a label: `accounts1920` = 2019-20, `fs2122` = 2021-22
//! - Bare year: `2019`, `FS2023`, `accounts-2023` (the start of the period)

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ParseError;
use crate::config::PeriodBounds;

/// Label immediately followed by four digits, e.g. `accounts1920`.
static COMPACT_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:accounts|statements|fs)([0-9]{4})(?:[^0-9]|$)").expect("static pattern")
});

/// Canonical period end: a 4-digit year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeriodEnd(i32);

impl PeriodEnd {
    pub fn new(year: i32) -> Option<Self> {
        (1000..=9999).contains(&year).then_some(Self(year))
    }

    pub fn year(self) -> i32 {
        self.0
    }

    /// Start year under the one-year financial period convention.
    pub fn start_year(self) -> i32 {
        self.0 - 1
    }
}

impl fmt::Display for PeriodEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl FromStr for PeriodEnd {
    type Err = ParseError;

    /// Accepts only an already-canonical 4-digit year.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let unparsable = || ParseError::UnparsablePeriod {
            token: s.to_string(),
        };
        if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(unparsable());
        }
        s.parse::<i32>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(unparsable)
    }
}

impl TryFrom<String> for PeriodEnd {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PeriodEnd> for String {
    fn from(value: PeriodEnd) -> Self {
        value.to_string()
    }
}

/// A reporting period that runs from `start` into `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    start: i32,
    end: i32,
}

impl Period {
    /// The usual one-year period beginning in `start`.
    pub fn from_start(start: i32) -> Self {
        Self {
            start,
            end: start + 1,
        }
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn period_end(&self) -> PeriodEnd {
        PeriodEnd(self.end)
    }

    /// Range label in the "2023-24" style.
    pub fn label(&self) -> String {
        format!("{}-{:02}", self.start, self.end.rem_euclid(100))
    }

    fn within(&self, bounds: &PeriodBounds) -> bool {
        self.end > self.start && bounds.contains(self.start) && bounds.contains(self.end)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Normalise a token into its canonical period-end string using default bounds.
///
/// `"2023-24"` → `"2024"`, `"2019"` → `"2020"`, `"accounts1920"` → `"2020"`.
pub fn normalize_period(token: &str) -> Result<String, ParseError> {
    parse_period(token, &PeriodBounds::default()).map(|p| p.period_end().to_string())
}

/// Parse a free-form token into a [`Period`].
///
/// # Algorithm
///
/// Rules are tried in priority order; within a rule, candidates are scanned
/// left to right and the first one inside `bounds` wins.
///
/// 1. Range: a 4-digit run, one `-` or `_`, then a 2- or 4-digit run.
///    A 2-digit end borrows the start year's century (rolling over at 99 → 00).
///    Packed 6- or 8-digit runs (`202324`) count when the years are consecutive.
/// 2. Compact: `accounts`/`statements`/`fs` followed by four digits whose
///    halves are consecutive two-digit years, read in the 2000s.
/// 3. Bare: any standalone 4-digit run is the start year; the period ends a
///    year later.
///
/// Both ends of the period must lie inside `bounds`, which keeps document
/// numbers and page counts from being read as years.
pub fn parse_period(token: &str, bounds: &PeriodBounds) -> Result<Period, ParseError> {
    let runs = digit_runs(token);

    range_candidates(token, &runs)
        .into_iter()
        .find(|p| p.within(bounds))
        .or_else(|| compact_candidates(token).find(|p| p.within(bounds)))
        .or_else(|| {
            runs.iter()
                .filter(|r| r.len() == 4)
                .filter_map(|r| token[r.start..r.end].parse().ok())
                .map(Period::from_start)
                .find(|p| p.within(bounds))
        })
        .ok_or_else(|| ParseError::UnparsablePeriod {
            token: token.to_string(),
        })
}

// ── Candidate scanning ──

#[derive(Debug, Clone, Copy)]
struct DigitRun {
    start: usize,
    end: usize,
}

impl DigitRun {
    fn len(&self) -> usize {
        self.end - self.start
    }
}

/// Maximal runs of ASCII digits, as byte ranges.
fn digit_runs(s: &str) -> Vec<DigitRun> {
    let bytes = s.as_bytes();
    let mut runs = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            runs.push(DigitRun { start, end: i });
        } else {
            i += 1;
        }
    }
    runs
}

/// Separated pairs (`2023-24`) and packed runs (`202324`, `20232024`), in
/// order of appearance.
fn range_candidates(token: &str, runs: &[DigitRun]) -> Vec<Period> {
    let bytes = token.as_bytes();
    let mut found: Vec<(usize, Period)> = Vec::new();

    for pair in runs.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let separated = b.start == a.end + 1 && matches!(bytes[a.end], b'-' | b'_');
        if !separated || a.len() != 4 || !matches!(b.len(), 2 | 4) {
            continue;
        }
        if let Some(period) = join_range(&token[a.start..a.end], &token[b.start..b.end]) {
            found.push((a.start, period));
        }
    }

    // Packed runs only count when the halves are consecutive years.
    for run in runs.iter().filter(|r| matches!(r.len(), 6 | 8)) {
        let digits = &token[run.start..run.end];
        if let Some(period) = join_range(&digits[..4], &digits[4..])
            && period.end == period.start + 1
        {
            found.push((run.start, period));
        }
    }

    found.sort_by_key(|(pos, _)| *pos);
    found.into_iter().map(|(_, p)| p).collect()
}

fn join_range(head: &str, tail: &str) -> Option<Period> {
    let start: i32 = head.parse().ok()?;
    let tail_value: i32 = tail.parse().ok()?;
    let end = if tail.len() == 2 {
        let expanded = start / 100 * 100 + tail_value;
        if expanded < start { expanded + 100 } else { expanded }
    } else {
        tail_value
    };
    Some(Period { start, end })
}

fn compact_candidates(token: &str) -> impl Iterator<Item = Period> + '_ {
    COMPACT_LABEL.captures_iter(token).filter_map(|caps| {
        let digits = caps.get(1)?.as_str();
        let first: i32 = digits[..2].parse().ok()?;
        let second: i32 = digits[2..].parse().ok()?;
        if (first + 1) % 100 != second {
            return None;
        }
        let end = 2000 + second;
        Some(Period {
            start: end - 1,
            end,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end_of(token: &str) -> String {
        normalize_period(token).unwrap_or_else(|e| panic!("{token:?}: {e}"))
    }

    #[test]
    fn range_two_digit_end() {
        assert_eq!(end_of("2023-24"), "2024");
        assert_eq!(end_of("2023_24"), "2024");
        assert_eq!(end_of("annual-report-2022-23"), "2023");
    }

    #[test]
    fn range_four_digit_end() {
        assert_eq!(end_of("2020-2021"), "2021");
        assert_eq!(end_of("2023_2024"), "2024");
        assert_eq!(end_of("financial-statements-2018-2019-final"), "2019");
    }

    #[test]
    fn range_rolls_over_century() {
        assert_eq!(end_of("1999-00"), "2000");
    }

    #[test]
    fn compact_after_label() {
        assert_eq!(end_of("accounts1920"), "2020");
        assert_eq!(end_of("Accounts2122"), "2022");
        assert_eq!(end_of("statements0910"), "2010");
        assert_eq!(end_of("fs1819"), "2019");
    }

    #[test]
    fn compact_ignores_non_ascii_digits() {
        assert!(matches!(
            normalize_period("accounts\u{FF11}\u{FF19}\u{FF12}\u{FF10}"),
            Err(ParseError::UnparsablePeriod { .. })
        ));
        assert_eq!(end_of("accounts1920\u{0661}"), "2020");
    }

    #[test]
    fn compact_needs_consecutive_halves() {
        // "2023" after FS is a bare start year, not 2020-23.
        assert_eq!(end_of("FS2023"), "2024");
    }

    #[test]
    fn bare_year_is_start() {
        assert_eq!(end_of("2019"), "2020");
        assert_eq!(end_of("accounts-2023"), "2024");
        assert_eq!(end_of("report2015"), "2016");
    }

    #[test]
    fn bare_years_across_range() {
        for y in 1990..2100 {
            assert_eq!(end_of(&y.to_string()), (y + 1).to_string());
        }
    }

    #[test]
    fn out_of_bounds_rejected() {
        for token in ["1989", "1700", "2101", "0042", "9999-00", "2100", "1850-51"] {
            assert!(
                matches!(normalize_period(token), Err(ParseError::UnparsablePeriod { .. })),
                "{token:?} should be unparsable"
            );
        }
    }

    #[test]
    fn no_digits_is_unparsable() {
        let err = normalize_period("annual-report").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnparsablePeriod {
                token: "annual-report".into()
            }
        );
    }

    #[test]
    fn range_beats_earlier_bare_year() {
        // The range rule has priority even though 2015 appears first.
        assert_eq!(end_of("2015_review_2019-20"), "2020");
    }

    #[test]
    fn out_of_bounds_candidate_skipped_within_rule() {
        assert_eq!(end_of("doc_0042_2019"), "2020");
        assert_eq!(end_of("1234-56_2021-22"), "2022");
    }

    #[test]
    fn packed_ranges() {
        assert_eq!(end_of("202324"), "2024");
        assert_eq!(end_of("FS_20232024"), "2024");
        assert_eq!(end_of("199900"), "2000");
    }

    #[test]
    fn packed_runs_need_consecutive_years() {
        assert!(normalize_period("202326").is_err());
        assert!(normalize_period("12345678").is_err());
    }

    #[test]
    fn reversed_range_is_not_a_range() {
        // Falls through to the bare-year rule on the first year.
        assert_eq!(end_of("2024-2023"), "2025");
    }

    #[test]
    fn custom_bounds() {
        let bounds = PeriodBounds {
            min_year: 2010,
            max_year: 2030,
        };
        assert!(parse_period("2005-06", &bounds).is_err());
        assert_eq!(parse_period("2015-16", &bounds).unwrap().end(), 2016);
    }

    #[test]
    fn labels() {
        assert_eq!(Period::from_start(2019).label(), "2019-20");
        assert_eq!(Period::from_start(1999).label(), "1999-00");
        assert_eq!(parse_period("2020-2021", &PeriodBounds::default()).unwrap().label(), "2020-21");
    }

    #[test]
    fn period_end_parse() {
        assert_eq!("2024".parse::<PeriodEnd>().unwrap().year(), 2024);
        assert_eq!("2024".parse::<PeriodEnd>().unwrap().start_year(), 2023);
        assert!("24".parse::<PeriodEnd>().is_err());
        assert!("2023-24".parse::<PeriodEnd>().is_err());
        assert!("".parse::<PeriodEnd>().is_err());
    }
}
