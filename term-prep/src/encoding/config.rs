//! Load configuration: what to do with each column and which transforms to
//! run while loading.
//!
//! A [`LoadConfig`] is usually parsed from a load document, which is a
//! profile report extended with a list of filters:
//!
//! ```json
//! {
//!   "dtypes": ["f", "S", "i"],
//!   "mean": [1.5, null, 1.2], "stdev": [0.5, null, 0.4],
//!   "min": [1, null, 1], "max": [2, null, 2],
//!   "classes": [[], ["x", "y"], ["1", "2"]],
//!   "filters": [
//!     {"name": "outputs", "columns": [2]},
//!     {"name": "permute", "columns": [2]},
//!     {"name": "balance", "sample": "oversampling"},
//!     {"name": "split", "start": 0, "end": 80}
//!   ],
//!   "output_class_counts": {"1": 40, "2": 10}
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::analyzers::profile::SemanticType;
use crate::analyzers::report::ProfileReport;
use crate::error::{PrepError, Result};

/// How a column is turned into numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    /// Numeric value, scaled per the normalization mode.
    Float,
    /// Categorical strings.
    PermuteCategorical,
    /// Small integers treated as categories.
    PermuteInteger,
    /// Not encoded.
    Ignore,
}

impl Encoding {
    pub fn is_permute(self) -> bool {
        matches!(self, Encoding::PermuteCategorical | Encoding::PermuteInteger)
    }
}

/// Scaling applied to numeric columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NormalizationMode {
    #[default]
    None,
    MinMax,
    StdScore,
}

impl NormalizationMode {
    fn parse(method: &str) -> Result<Self> {
        match method.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "none" => Ok(NormalizationMode::None),
            "minmax" => Ok(NormalizationMode::MinMax),
            "stdscore" | "zscore" | "standard" => Ok(NormalizationMode::StdScore),
            other => Err(PrepError::invalid_config(format!(
                "unknown normalization method '{other}'"
            ))),
        }
    }
}

/// Class balancing applied to the output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BalancingMode {
    #[default]
    None,
    Uniform,
    Undersample,
    Oversample,
}

/// Per-column load settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub is_output: bool,
    pub encoding: Encoding,
    pub mean: f64,
    pub stdev: f64,
    pub min: f64,
    pub max: f64,
    pub classes: BTreeSet<String>,
    pub is_integer_categorical: bool,
}

impl Default for FieldSpec {
    fn default() -> Self {
        Self {
            is_output: false,
            encoding: Encoding::Float,
            mean: 0.0,
            stdev: 0.0,
            min: 0.0,
            max: 0.0,
            classes: BTreeSet::new(),
            is_integer_categorical: false,
        }
    }
}

impl FieldSpec {
    /// A numeric input column with the given statistics.
    pub fn numeric(mean: f64, stdev: f64, min: f64, max: f64) -> Self {
        Self {
            mean,
            stdev,
            min,
            max,
            ..Self::default()
        }
    }

    /// A categorical input column.
    pub fn categorical<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            encoding: Encoding::PermuteCategorical,
            classes: classes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// A column that is not encoded.
    pub fn ignored() -> Self {
        Self {
            encoding: Encoding::Ignore,
            ..Self::default()
        }
    }

    /// Marks the column as an output.
    pub fn output(mut self) -> Self {
        self.is_output = true;
        self
    }

    /// Settings derived from a profiled column type.
    fn from_type(
        dtype: SemanticType,
        stats: [Option<f64>; 4],
        classes: BTreeSet<String>,
    ) -> Self {
        let [mean, stdev, min, max] = stats.map(|v| v.unwrap_or(0.0));
        match dtype {
            SemanticType::Categorical => Self {
                encoding: Encoding::PermuteCategorical,
                classes,
                ..Self::default()
            },
            SemanticType::Other => Self {
                encoding: Encoding::Ignore,
                classes,
                ..Self::default()
            },
            SemanticType::Integer | SemanticType::Float => Self {
                encoding: Encoding::Float,
                mean,
                stdev,
                min,
                max,
                classes,
                is_integer_categorical: dtype == SemanticType::Integer,
                ..Self::default()
            },
        }
    }

    /// Switches the column to categorical encoding.
    fn permute(&mut self) {
        self.encoding = if self.is_integer_categorical {
            Encoding::PermuteInteger
        } else {
            Encoding::PermuteCategorical
        };
    }
}

/// Row range kept by the split transform, in percent of the rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitBounds {
    pub start: f64,
    pub end: f64,
}

/// Everything the loader needs to know about a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoadConfig {
    /// One spec per column, in column order
    pub fields: Vec<FieldSpec>,
    pub normalization: NormalizationMode,
    /// Requested balancing; see [`effective_balancing`](Self::effective_balancing)
    pub balancing: BalancingMode,
    pub shuffle: bool,
    pub split: Option<SplitBounds>,
    /// Rows per output class, ordered by class, with a leading 0 for the
    /// reserved missing-value class
    pub output_class_counts: Vec<u64>,
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoadDocument {
    #[serde(default)]
    version: Option<Value>,
    dtypes: Vec<SemanticType>,
    mean: Vec<Option<f64>>,
    stdev: Vec<Option<f64>>,
    min: Vec<Option<f64>>,
    max: Vec<Option<f64>>,
    classes: Vec<Vec<Value>>,
    #[serde(default)]
    filters: Vec<Value>,
    #[serde(default)]
    output_class_counts: Option<BTreeMap<String, Value>>,
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reads a number that may be spelled as a JSON number or a numeric string.
fn value_to_f64(v: &Value, what: &str) -> Result<f64> {
    let parsed = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| PrepError::invalid_config(format!("{what} is not a number: {v}")))
}

fn value_to_index(v: &Value, what: &str) -> Result<usize> {
    let x = value_to_f64(v, what)?;
    if x < 0.0 || x.fract() != 0.0 {
        return Err(PrepError::invalid_config(format!(
            "{what} is not a valid index: {v}"
        )));
    }
    Ok(x as usize)
}

fn columns_of(filter: &serde_json::Map<String, Value>, width: usize) -> Result<Vec<usize>> {
    let columns = filter
        .get("columns")
        .and_then(Value::as_array)
        .ok_or_else(|| PrepError::invalid_config("filter is missing its 'columns' list"))?;
    let mut indexes = columns
        .iter()
        .map(|c| value_to_index(c, "column"))
        .collect::<Result<Vec<_>>>()?;
    indexes.sort_unstable();
    if let Some(&bad) = indexes.iter().find(|&&c| c >= width) {
        return Err(PrepError::invalid_config(format!(
            "column index {bad} out of range for {width} columns"
        )));
    }
    Ok(indexes)
}

impl LoadConfig {
    /// Parses a load document.
    pub fn from_json(text: &str) -> Result<Self> {
        let doc: LoadDocument = serde_json::from_str(text)?;
        Self::from_document(doc)
    }

    /// Builds a configuration from an already parsed load document.
    pub fn from_value(value: Value) -> Result<Self> {
        let doc: LoadDocument = serde_json::from_value(value)?;
        Self::from_document(doc)
    }

    fn from_document(doc: LoadDocument) -> Result<Self> {
        let cols = doc.dtypes.len();
        for (name, len) in [
            ("mean", doc.mean.len()),
            ("stdev", doc.stdev.len()),
            ("min", doc.min.len()),
            ("max", doc.max.len()),
            ("classes", doc.classes.len()),
        ] {
            if len != cols {
                return Err(PrepError::invalid_config(format!(
                    "'{name}' has {len} entries, expected {cols}"
                )));
            }
        }

        let mut fields: Vec<FieldSpec> = (0..cols)
            .map(|i| {
                FieldSpec::from_type(
                    doc.dtypes[i],
                    [doc.mean[i], doc.stdev[i], doc.min[i], doc.max[i]],
                    doc.classes[i].iter().map(value_to_string).collect(),
                )
            })
            .collect();

        let mut config = LoadConfig {
            version: doc.version.as_ref().map(value_to_string),
            ..LoadConfig::default()
        };

        for filter in &doc.filters {
            let Some(filter) = filter.as_object() else {
                return Err(PrepError::invalid_config("filter entries must be objects"));
            };
            let Some(name) = filter.get("name").and_then(Value::as_str) else {
                continue;
            };
            match name {
                "ignore" => {
                    for c in columns_of(filter, cols)? {
                        fields[c].encoding = Encoding::Ignore;
                    }
                }
                "outputs" => {
                    for c in columns_of(filter, cols)? {
                        fields[c].is_output = true;
                    }
                }
                "permute" => {
                    for c in columns_of(filter, cols)? {
                        fields[c].permute();
                    }
                }
                "normalize" => {
                    config.normalization = match filter.get("method").and_then(Value::as_str) {
                        Some(method) => NormalizationMode::parse(method)?,
                        None => NormalizationMode::MinMax,
                    };
                }
                "balance" => {
                    config.balancing = match filter.get("sample").and_then(Value::as_str) {
                        Some("undersampling") => BalancingMode::Undersample,
                        Some("oversampling") => BalancingMode::Oversample,
                        Some("uniform") => BalancingMode::Uniform,
                        other => {
                            warn!(sample = ?other, "Ignoring unknown balancing method");
                            config.balancing
                        }
                    };
                }
                "shuffle" => config.shuffle = true,
                "merge" => debug!("Merge filter has no effect"),
                "split" => {
                    let bound = |key: &str| {
                        filter
                            .get(key)
                            .ok_or_else(|| {
                                PrepError::invalid_config(format!("split filter is missing '{key}'"))
                            })
                            .and_then(|v| value_to_f64(v, key))
                    };
                    config.split = Some(SplitBounds {
                        start: bound("start")?,
                        end: bound("end")?,
                    });
                }
                other => debug!(filter = other, "Ignoring unknown filter"),
            }
        }

        config.fields = fields;
        config.balancing = config.effective_balancing();
        if config.balancing != BalancingMode::None {
            let counts = doc.output_class_counts.as_ref().ok_or_else(|| {
                PrepError::invalid_config("balancing requires 'output_class_counts'")
            })?;
            let mut ordered = Vec::with_capacity(counts.len() + 1);
            ordered.push(0);
            for (class, count) in counts {
                let n = value_to_index(count, &format!("count of class '{class}'"))?;
                ordered.push(n as u64);
            }
            config.output_class_counts = ordered;
        }
        Ok(config)
    }

    /// Default configuration for a profiled table: the last column is the
    /// output, string columns are categorical, free-text columns are ignored.
    pub fn from_report(report: &ProfileReport) -> Self {
        let mut fields: Vec<FieldSpec> = (0..report.num_columns)
            .map(|i| {
                FieldSpec::from_type(
                    report.dtypes[i],
                    [report.mean[i], report.stdev[i], report.min[i], report.max[i]],
                    report.classes[i].iter().cloned().collect(),
                )
            })
            .collect();
        let mut output_class_counts = Vec::new();
        if let Some(last) = fields.last_mut() {
            last.is_output = true;
            if !report.last_column_info.classes.is_empty() {
                output_class_counts.push(0);
                output_class_counts.extend(report.last_column_info.classes.values().copied());
            }
        }
        LoadConfig {
            fields,
            output_class_counts,
            version: Some(report.version.to_string()),
            ..LoadConfig::default()
        }
    }

    pub fn num_columns(&self) -> usize {
        self.fields.len()
    }

    /// Indexes of the output columns.
    pub fn output_columns(&self) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_output)
            .map(|(i, _)| i)
            .collect()
    }

    /// Balancing actually applied: only with exactly one output column
    /// that is encoded categorically.
    pub fn effective_balancing(&self) -> BalancingMode {
        match self.output_columns().as_slice() {
            [only] if self.fields[*only].encoding.is_permute() => self.balancing,
            _ => BalancingMode::None,
        }
    }
}
