//! Serializable profile document.
//!
//! The layout is column-major: every per-column property is an array indexed
//! by column. Numeric statistics are `null` for non-numeric columns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analyzers::profile::{ColumnProfile, SemanticType};
use crate::analyzers::profiler::TableProfile;

/// Format version written to every report.
pub const REPORT_VERSION: u32 = 3;

/// Profile of a delimited table, as written by `term-prep profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileReport {
    pub version: u32,
    pub data_type: String,
    /// Input size in bytes
    pub size: u64,
    pub data_rows: u64,
    pub empty_rows: u64,
    pub invalid_rows: u64,
    pub num_columns: usize,
    /// Separator as a regular expression
    #[serde(rename = "delimeter")]
    pub delimiter: String,
    pub with_header: bool,
    pub names: Vec<String>,
    pub dtypes: Vec<SemanticType>,
    /// Class names per column, filled for `i` columns as well as `S` so they
    /// can be loaded as categorical
    pub classes: Vec<Vec<String>>,
    pub uniques_per_col: Vec<usize>,
    /// Whether the column type is fixed (anything but `i`, which may still be
    /// treated as categorical)
    pub locked: Vec<bool>,
    pub histogram: Vec<Vec<u64>>,
    pub bins: Vec<Vec<f64>>,
    pub mean: Vec<Option<f64>>,
    pub stdev: Vec<Option<f64>>,
    pub min: Vec<Option<f64>>,
    pub max: Vec<Option<f64>>,
    pub last_column_info: LastColumnInfo,
}

/// Summary of the last column, the default prediction target.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LastColumnInfo {
    pub min: f64,
    pub max: f64,
    pub unique: usize,
    /// Class -> occurrence count, for `i` and `S` columns
    pub classes: BTreeMap<String, u64>,
    /// Class -> share of the column's values
    pub distrib: BTreeMap<String, f64>,
}

impl LastColumnInfo {
    fn from_column(column: &ColumnProfile) -> Self {
        let unique = column.unique().size();
        let (min, max) = if column.is_numeric() {
            (column.stats().min(), column.stats().max())
        } else {
            (0.0, unique.saturating_sub(1) as f64)
        };

        let mut classes = BTreeMap::new();
        let mut distrib = BTreeMap::new();
        if column.has_classes() {
            let counts = column.classes();
            let total: u64 = counts.iter().map(|(_, c)| c).sum();
            for (class, count) in counts {
                if total > 0 {
                    distrib.insert(class.clone(), count as f64 / total as f64);
                }
                classes.insert(class, count);
            }
        }

        Self {
            min,
            max,
            unique,
            classes,
            distrib,
        }
    }
}

fn numeric<F: Fn(&ColumnProfile) -> f64>(columns: &[ColumnProfile], f: F) -> Vec<Option<f64>> {
    columns
        .iter()
        .map(|c| if c.is_numeric() { Some(f(c)) } else { None })
        .collect()
}

impl From<&TableProfile> for ProfileReport {
    fn from(profile: &TableProfile) -> Self {
        let columns = &profile.columns;
        Self {
            version: REPORT_VERSION,
            data_type: "GENERAL".to_string(),
            size: profile.size_bytes,
            data_rows: profile.valid_data_rows,
            empty_rows: profile.empty_rows,
            invalid_rows: profile.invalid_rows,
            num_columns: columns.len(),
            delimiter: profile.separator.pretty().to_string(),
            with_header: profile.has_header,
            names: columns.iter().map(|c| c.name().to_string()).collect(),
            dtypes: columns.iter().map(ColumnProfile::semantic_type).collect(),
            classes: columns
                .iter()
                .map(|c| {
                    if c.has_classes() {
                        c.classes().into_iter().map(|(k, _)| k).collect()
                    } else {
                        Vec::new()
                    }
                })
                .collect(),
            uniques_per_col: columns.iter().map(|c| c.unique().size()).collect(),
            locked: columns
                .iter()
                .map(|c| c.semantic_type() != SemanticType::Integer)
                .collect(),
            histogram: columns
                .iter()
                .map(|c| c.histogram().map(|h| h.counts().to_vec()).unwrap_or_default())
                .collect(),
            bins: columns
                .iter()
                .map(|c| c.histogram().map(|h| h.edges()).unwrap_or_default())
                .collect(),
            mean: numeric(columns, |c| c.stats().mean()),
            stdev: numeric(columns, |c| c.stats().stdev()),
            min: numeric(columns, |c| c.stats().min()),
            max: numeric(columns, |c| c.stats().max()),
            last_column_info: columns
                .last()
                .map(LastColumnInfo::from_column)
                .unwrap_or_default(),
        }
    }
}

impl ProfileReport {
    /// Pretty-printed JSON document.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
