//! Per-column profile accumulated across the two profiling passes.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analyzers::histogram::{heuristic_bin_count, Histogram};
use crate::analyzers::online_stats::OnlineStats;
use crate::analyzers::unique::BoundedUniqueTracker;
use crate::error::Result;
use crate::tokenizer::{is_integer_text, parse_real};

/// Number of failed numeric parses sampled per column before type sampling stops.
pub const ERROR_STRING_CAP: u64 = 100;

/// A column with at most this many distinct values is categorical.
pub const CATEGORICAL_MAX_UNIQUE: usize = 200;

/// Share of numeric values above which a column is numeric.
pub const NUMERIC_RATIO_THRESHOLD: f64 = 0.9;

/// Largest value an integer-categorical column may hold.
pub const INTEGER_MAX_VALUE: f64 = 200.0;

/// Thresholds for the type heuristics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeThresholds {
    pub error_string_cap: u64,
    pub categorical_max_unique: usize,
    pub numeric_ratio: f64,
    pub integer_max_value: f64,
}

impl Default for TypeThresholds {
    fn default() -> Self {
        Self {
            error_string_cap: ERROR_STRING_CAP,
            categorical_max_unique: CATEGORICAL_MAX_UNIQUE,
            numeric_ratio: NUMERIC_RATIO_THRESHOLD,
            integer_max_value: INTEGER_MAX_VALUE,
        }
    }
}

/// Semantic type of a column, in decreasing priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticType {
    /// Small non-negative integers, usable as classes.
    #[serde(rename = "i")]
    Integer,
    /// Any other numeric column.
    #[serde(rename = "f")]
    Float,
    /// Low-cardinality strings.
    #[serde(rename = "S")]
    Categorical,
    /// Anything else (free text, identifiers).
    #[serde(rename = "-")]
    Other,
}

impl SemanticType {
    /// One-letter tag used in reports and load documents.
    pub fn tag(self) -> &'static str {
        match self {
            SemanticType::Integer => "i",
            SemanticType::Float => "f",
            SemanticType::Categorical => "S",
            SemanticType::Other => "-",
        }
    }

    /// Parses a one-letter tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "i" => Some(SemanticType::Integer),
            "f" => Some(SemanticType::Float),
            "S" => Some(SemanticType::Categorical),
            "-" => Some(SemanticType::Other),
            _ => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, SemanticType::Integer | SemanticType::Float)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Aggregated type, statistics, uniqueness and histogram state of one column.
///
/// The histogram is absent until pass 1 finishes; afterwards it is only
/// filled further, never replaced. Statistics are frozen after pass 1: rows
/// invalidated in pass 2 are retracted from the uniqueness counts only.
#[derive(Debug, Clone)]
pub struct ColumnProfile {
    pub(crate) name: String,
    pub(crate) numeric_count: u64,
    pub(crate) string_count: u64,
    pub(crate) error_strings: BTreeSet<String>,
    pub(crate) unique: BoundedUniqueTracker,
    pub(crate) stats: OnlineStats,
    pub(crate) histogram: Option<Histogram>,
    thresholds: TypeThresholds,
}

impl ColumnProfile {
    pub fn new(name: impl Into<String>, unique: BoundedUniqueTracker, thresholds: TypeThresholds) -> Self {
        Self {
            name: name.into(),
            numeric_count: 0,
            string_count: 0,
            error_strings: BTreeSet::new(),
            unique,
            stats: OnlineStats::new(),
            histogram: None,
            thresholds,
        }
    }

    /// Pass 1 update with one raw field.
    ///
    /// Empty fields are skipped. Type sampling stops once
    /// `error_string_cap` failed parses have been seen; the value still feeds
    /// the uniqueness tracker.
    pub fn observe(&mut self, field: &str) {
        if field.is_empty() {
            return;
        }
        if self.string_count < self.thresholds.error_string_cap {
            match parse_real(field) {
                Some(x) => {
                    self.numeric_count += 1;
                    self.stats.add(x);
                }
                None => {
                    self.string_count += 1;
                    self.error_strings.insert(field.to_string());
                }
            }
        }
        self.unique.add(field);
    }

    /// Closes pass 1: numeric columns drop their unparsable values from the
    /// uniqueness counts and get a histogram over `[min, max]`. A column
    /// whose bounds are not finite is left to the rank histogram of pass 2.
    pub fn finish_pass1(&mut self) -> Result<()> {
        if !self.is_numeric() {
            return Ok(());
        }
        for s in &self.error_strings {
            self.unique.remove_all(s);
        }
        let (min, max) = (self.stats.min(), self.stats.max());
        if !(min.is_finite() && max.is_finite()) {
            warn!(column = %self.name, min, max, "Numeric column has unbounded range, skipping value histogram");
            return Ok(());
        }
        let bins = heuristic_bin_count(self.unique.size());
        self.histogram = Some(Histogram::new(min, max, bins)?);
        Ok(())
    }

    /// Pass 2 update. Returns false when the field makes its row invalid
    /// (a non-empty, unparsable value in a numeric column).
    pub fn observe_pass2(&mut self, field: &str) -> bool {
        if field.is_empty() {
            return true;
        }
        match self.histogram.as_mut() {
            Some(h) => match parse_real(field) {
                Some(x) => {
                    h.add(x);
                    true
                }
                None => false,
            },
            None => true,
        }
    }

    /// Retracts one pass-1 contribution of `field` from the uniqueness counts.
    pub fn retract(&mut self, field: &str) {
        self.unique.remove(field);
    }

    /// Closes pass 2: columns still lacking a histogram get a rank histogram
    /// with one bin per distinct value (ordered by value) holding its count.
    pub fn finish_pass2(&mut self) -> Result<()> {
        let n = self.unique.size();
        if self.histogram.is_some() || n == 0 {
            return Ok(());
        }
        let mut hist = Histogram::new(0.0, (n - 1) as f64, n)?;
        for (rank, (_, count)) in self.unique.sorted_counts().into_iter().enumerate() {
            hist.add_count(rank as f64, count);
        }
        self.histogram = Some(hist);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn numeric_count(&self) -> u64 {
        self.numeric_count
    }

    pub fn string_count(&self) -> u64 {
        self.string_count
    }

    /// Distinct unparsable values seen during type sampling.
    pub fn error_strings(&self) -> &BTreeSet<String> {
        &self.error_strings
    }

    pub fn unique(&self) -> &BoundedUniqueTracker {
        &self.unique
    }

    pub fn stats(&self) -> &OnlineStats {
        &self.stats
    }

    pub fn histogram(&self) -> Option<&Histogram> {
        self.histogram.as_ref()
    }

    pub fn is_numeric(&self) -> bool {
        let total = self.numeric_count + self.string_count;
        total > 0 && (self.numeric_count as f64 / total as f64) > self.thresholds.numeric_ratio
    }

    pub fn is_categorical(&self) -> bool {
        self.unique.size() <= self.thresholds.categorical_max_unique
    }

    /// Numeric, categorical, within `[0, integer_max_value]` and every
    /// distinct value is an integer.
    pub fn is_integer(&self) -> bool {
        self.is_numeric()
            && self.is_categorical()
            && self.stats.min() >= 0.0
            && self.stats.max() <= self.thresholds.integer_max_value
            && self.unique.keys().all(is_integer_text)
    }

    pub fn semantic_type(&self) -> SemanticType {
        if self.is_numeric() {
            if self.is_integer() {
                SemanticType::Integer
            } else {
                SemanticType::Float
            }
        } else if self.is_categorical() {
            SemanticType::Categorical
        } else {
            SemanticType::Other
        }
    }

    /// Whether the report lists the column's distinct values as classes.
    pub fn has_classes(&self) -> bool {
        matches!(
            self.semantic_type(),
            SemanticType::Integer | SemanticType::Categorical
        )
    }

    /// Distinct values ordered by value; integer columns are normalised to
    /// their integer spelling ("3.0" becomes "3").
    pub fn classes(&self) -> Vec<(String, u64)> {
        let integer = self.semantic_type() == SemanticType::Integer;
        self.unique
            .sorted_counts()
            .into_iter()
            .map(|(k, c)| {
                let key = if integer {
                    format_as_integer(k)
                } else {
                    k.to_string()
                };
                (key, c)
            })
            .collect()
    }
}

fn format_as_integer(s: &str) -> String {
    match parse_real(s) {
        Some(x) => format!("{}", x.trunc() as i64),
        None => s.to_string(),
    }
}
