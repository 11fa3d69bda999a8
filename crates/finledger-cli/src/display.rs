//! Terminal summaries for reconciliation runs and search plans.

use finledger_core::{CoverageEntry, CoverageReport, MissingPeriod, Reconciliation, SearchRequest};

const TOP_INSTITUTIONS: usize = 10;
const MAX_LISTED_PERIODS: usize = 5;
const RECENT_WINDOW: i32 = 2;

// ── Summary figures ──

/// Headline counts over a coverage report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverageSummary {
    pub institutions: usize,
    pub with_data: usize,
    pub recent: usize,
    pub with_gaps: usize,
    pub total_missing: usize,
}

impl CoverageSummary {
    pub fn of(report: &CoverageReport) -> Self {
        Self {
            institutions: report.entries.len(),
            with_data: report.entries.iter().filter(|e| !e.known.is_empty()).count(),
            recent: report.recent(RECENT_WINDOW),
            with_gaps: report.with_gaps().count(),
            total_missing: report.total_missing(),
        }
    }
}

// ── Public API ──

pub fn print_reconciliation(result: &Reconciliation) {
    println!("=== Reconciliation ===");
    println!("  {:<26} {}", "inserted", result.inserted());
    println!("  {:<26} {}", "updated", result.updated());
    println!("  {:<26} {}", "conflicts", result.conflicts());
    println!("  {:<26} {}", "placeholders added", result.placeholders_added);
    println!("  {:<26} {}", "skipped files", result.skipped.len());
    println!("  {:<26} {}", "unmatched names", result.unmatched.len());
    println!();

    print_coverage(&result.coverage);
}

pub fn print_coverage(report: &CoverageReport) {
    let summary = CoverageSummary::of(report);

    println!("=== Coverage (as of {}) ===", report.current_year);
    println!("  {:<26} {}", "institutions", summary.institutions);
    println!("  {:<26} {}", "with data", summary.with_data);
    println!(
        "  {:<26} {}",
        format!("recent (since {})", report.current_year - RECENT_WINDOW),
        summary.recent
    );
    println!("  {:<26} {}", "with gaps", summary.with_gaps);
    println!("  {:<26} {}", "missing periods", summary.total_missing);

    let top: Vec<&CoverageEntry> = report.with_gaps().take(TOP_INSTITUTIONS).collect();
    if top.is_empty() {
        return;
    }
    println!();
    println!("Most missing");
    for entry in top {
        println!("  {}", gap_line(entry));
    }
}

pub fn print_plan(requests: &[SearchRequest]) {
    println!("=== Planned searches ({}) ===", requests.len());
    for request in requests {
        println!("  {}", request.query);
    }
}

// ── Formatting helpers ──

fn gap_line(entry: &CoverageEntry) -> String {
    format!(
        "{:<40} {:>3}  {}",
        truncate(&entry.institution.name, 40),
        entry.missing.len(),
        missing_cell(&entry.missing)
    )
}

/// Period labels when there are few of them, else nothing.
fn missing_cell(missing: &[MissingPeriod]) -> String {
    if missing.len() > MAX_LISTED_PERIODS {
        return String::new();
    }
    missing.iter().map(MissingPeriod::label).collect::<Vec<_>>().join(", ")
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
