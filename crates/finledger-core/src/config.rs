//! Tunable heuristics for the reconciliation engine.
//!
//! The defaults were tuned against UK higher-education institutions and
//! their published financial statements. They are plain data so a JSON
//! config file can override any subset of them.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub names: NameParseConfig,
    pub matching: MatchConfig,
    pub periods: PeriodBounds,
    pub coverage: CoveragePolicy,
    pub plan: PlanConfig,
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON config; missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Check values that would push coverage windows outside the period bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let check = |field: &'static str, value: i64, min: i64, max: i64| {
            if (min..=max).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::OutOfRange { field, value, min, max })
            }
        };
        let (lo, hi) = (i64::from(self.periods.min_year), i64::from(self.periods.max_year));
        check("periods.min_year", lo, 1000, hi)?;
        check("periods.max_year", hi, lo, 9999)?;
        check("coverage.max_lookback", self.coverage.max_lookback.into(), 0, hi - lo)?;
        check("coverage.max_forward", self.coverage.max_forward.into(), 0, hi - lo)?;
        Ok(())
    }
}

/// Stop conditions for the greedy file-name parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameParseConfig {
    pub delimiter: char,
    pub max_tokens: usize,
    pub max_token_len: usize,
    pub max_hyphens: usize,
    /// Matched anywhere inside a token, case-insensitively.
    pub keywords: Vec<String>,
    /// Matched only at the start of a token, followed by a digit, `-` or nothing.
    pub prefix_keywords: Vec<String>,
}

impl Default for NameParseConfig {
    fn default() -> Self {
        Self {
            delimiter: '_',
            max_tokens: 4,
            max_token_len: 30,
            max_hyphens: 2,
            keywords: [
                "annual",
                "report",
                "financial",
                "statement",
                "accounts",
                "document",
                "final",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            prefix_keywords: vec!["fs".to_string()],
        }
    }
}

/// Thresholds for the token-overlap stage of registry matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub min_shared_tokens: usize,
    /// A candidate must score strictly above this.
    pub min_score: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_shared_tokens: 2,
            min_score: 0.5,
        }
    }
}

/// Inclusive bounds on any year parsed out of a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodBounds {
    pub min_year: i32,
    pub max_year: i32,
}

impl Default for PeriodBounds {
    fn default() -> Self {
        Self {
            min_year: 1990,
            max_year: 2100,
        }
    }
}

impl PeriodBounds {
    pub fn contains(&self, year: i32) -> bool {
        (self.min_year..=self.max_year).contains(&year)
    }
}

/// How far around the known range the coverage analyzer looks for gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoveragePolicy {
    pub max_lookback: i32,
    pub max_forward: i32,
    /// Backward lookback never goes earlier than this start year.
    pub lookback_floor: i32,
}

impl Default for CoveragePolicy {
    fn default() -> Self {
        Self {
            max_lookback: 5,
            max_forward: 2,
            lookback_floor: 2000,
        }
    }
}

/// Limits for search planning and the collection loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    pub institutions_per_iteration: usize,
    pub periods_per_institution: usize,
    pub max_iterations: usize,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            institutions_per_iteration: 5,
            periods_per_institution: 3,
            max_iterations: 10,
        }
    }
}
