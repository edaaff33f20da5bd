//! Per-column numeric encoders.
//!
//! Every encoder writes a fixed number of values for any field, known once
//! the encoder is built. Empty fields are missing values and always encode
//! to the variant's neutral value.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::error::{PrepError, Result};
use crate::tokenizer::parse_real;

/// Failure to encode a single field.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("value '{0}' is not a number")]
    NotNumeric(String),

    #[error("value '{0}' is not a known class")]
    UnknownClass(String),

    #[error("value '{value}' is neither '{first}' nor '{second}'")]
    NotBinary {
        value: String,
        first: String,
        second: String,
    },

    #[error("integer {value} is above the encoded range ending at {max}")]
    IntegerOutOfRange { value: f64, max: i64 },

    #[error("encoder writes {expected} values but was given {actual}")]
    WidthMismatch { expected: usize, actual: usize },
}

impl EncodeError {
    /// Bad data rather than a broken caller.
    pub fn is_data_error(&self) -> bool {
        !matches!(self, EncodeError::WidthMismatch { .. })
    }
}

impl From<EncodeError> for PrepError {
    fn from(err: EncodeError) -> Self {
        if err.is_data_error() {
            PrepError::input(err.to_string())
        } else {
            PrepError::internal(err.to_string())
        }
    }
}

/// A fitted column encoder.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnEncoder {
    /// Writes nothing.
    Ignore,
    /// Writes a single zero, for columns without information.
    Constant,
    /// The number itself; missing values become `mean`.
    NumericRaw { mean: f64 },
    /// Scaled to `[0, 1]`; missing values become the scaled mean.
    NumericMinMax { min: f64, range: f64, missing: f64 },
    /// Standard score; missing values become 0.
    NumericStdScore { mean: f64, stdev: f64 },
    /// One indicator per class.
    OneHotCategorical { index: BTreeMap<String, usize> },
    /// 1-based class index, 0 for missing.
    OrdinalIndex { index: BTreeMap<String, usize> },
    /// `first` -> 0, `second` -> 1, missing -> 0.5.
    Binary { first: String, second: String },
    /// One indicator per integer in `(min, max]`.
    IntegerOneHot { min: i64, max: i64 },
}

fn class_index<I, S>(classes: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut names: Vec<String> = classes.into_iter().map(Into::into).collect();
    names.sort();
    names.dedup();
    names.into_iter().enumerate().map(|(i, c)| (c, i)).collect()
}

fn parse_field(field: &str) -> std::result::Result<f64, EncodeError> {
    parse_real(field).ok_or_else(|| EncodeError::NotNumeric(field.to_string()))
}

impl ColumnEncoder {
    pub fn numeric_raw(mean: f64) -> Self {
        ColumnEncoder::NumericRaw { mean }
    }

    /// Min-max scaling. Requires `min < max` and `mean` within the range.
    pub fn numeric_min_max(min: f64, max: f64, mean: f64) -> Result<Self> {
        if min.is_nan() || max.is_nan() || max <= min {
            return Err(PrepError::internal(format!(
                "min-max encoder needs min < max, got [{min}, {max}]"
            )));
        }
        if mean < min || mean > max {
            return Err(PrepError::internal(format!(
                "min-max encoder mean {mean} outside [{min}, {max}]"
            )));
        }
        let range = max - min;
        Ok(ColumnEncoder::NumericMinMax {
            min,
            range,
            missing: (mean - min) / range,
        })
    }

    /// Standard score scaling. Requires a positive `stdev`.
    pub fn numeric_std_score(mean: f64, stdev: f64) -> Result<Self> {
        if stdev.is_nan() || stdev <= 0.0 {
            return Err(PrepError::internal(format!(
                "standard score encoder needs a positive stdev, got {stdev}"
            )));
        }
        Ok(ColumnEncoder::NumericStdScore { mean, stdev })
    }

    pub fn one_hot<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ColumnEncoder::OneHotCategorical {
            index: class_index(classes),
        }
    }

    pub fn ordinal<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ColumnEncoder::OrdinalIndex {
            index: class_index(classes),
        }
    }

    pub fn binary(first: impl Into<String>, second: impl Into<String>) -> Self {
        ColumnEncoder::Binary {
            first: first.into(),
            second: second.into(),
        }
    }

    /// Integer indicators over `(min, max]`. Requires `min <= max`.
    pub fn integer_one_hot(min: i64, max: i64) -> Result<Self> {
        if min > max {
            return Err(PrepError::internal(format!(
                "integer encoder range [{min}, {max}] is empty"
            )));
        }
        Ok(ColumnEncoder::IntegerOneHot { min, max })
    }

    /// Number of values written per field.
    pub fn encoded_width(&self) -> usize {
        match self {
            ColumnEncoder::Ignore => 0,
            ColumnEncoder::OneHotCategorical { index } => index.len(),
            ColumnEncoder::IntegerOneHot { min, max } => (max - min) as usize,
            _ => 1,
        }
    }

    /// Short variant name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ColumnEncoder::Ignore => "ignore",
            ColumnEncoder::Constant => "constant",
            ColumnEncoder::NumericRaw { .. } => "numeric",
            ColumnEncoder::NumericMinMax { .. } => "numeric_min_max",
            ColumnEncoder::NumericStdScore { .. } => "numeric_std_score",
            ColumnEncoder::OneHotCategorical { .. } => "one_hot",
            ColumnEncoder::OrdinalIndex { .. } => "ordinal",
            ColumnEncoder::Binary { .. } => "binary",
            ColumnEncoder::IntegerOneHot { .. } => "integer_one_hot",
        }
    }

    /// Encodes `field` into `out`, which must be exactly
    /// [`encoded_width`](Self::encoded_width) long. On failure `out` holds
    /// unspecified values.
    pub fn encode_into(&self, field: &str, out: &mut [f64]) -> std::result::Result<(), EncodeError> {
        let expected = self.encoded_width();
        if out.len() != expected {
            return Err(EncodeError::WidthMismatch {
                expected,
                actual: out.len(),
            });
        }
        let missing = field.is_empty();

        match self {
            ColumnEncoder::Ignore => {}
            ColumnEncoder::Constant => out[0] = 0.0,
            ColumnEncoder::NumericRaw { mean } => {
                out[0] = if missing { *mean } else { parse_field(field)? };
            }
            ColumnEncoder::NumericMinMax {
                min,
                range,
                missing: fill,
            } => {
                out[0] = if missing {
                    *fill
                } else {
                    (parse_field(field)? - min) / range
                };
            }
            ColumnEncoder::NumericStdScore { mean, stdev } => {
                out[0] = if missing {
                    0.0
                } else {
                    (parse_field(field)? - mean) / stdev
                };
            }
            ColumnEncoder::OneHotCategorical { index } => {
                out.fill(0.0);
                if !missing {
                    let i = lookup(index, field)?;
                    out[i] = 1.0;
                }
            }
            ColumnEncoder::OrdinalIndex { index } => {
                out[0] = if missing {
                    0.0
                } else {
                    (lookup(index, field)? + 1) as f64
                };
            }
            ColumnEncoder::Binary { first, second } => {
                out[0] = if missing {
                    0.5
                } else if field == first {
                    0.0
                } else if field == second {
                    1.0
                } else {
                    return Err(EncodeError::NotBinary {
                        value: field.to_string(),
                        first: first.clone(),
                        second: second.clone(),
                    });
                };
            }
            ColumnEncoder::IntegerOneHot { min, max } => {
                out.fill(0.0);
                if !missing {
                    let x = parse_field(field)?.trunc();
                    if x > *max as f64 {
                        return Err(EncodeError::IntegerOutOfRange { value: x, max: *max });
                    }
                    if x > *min as f64 {
                        out[(x - *min as f64) as usize - 1] = 1.0;
                    }
                }
            }
        }
        Ok(())
    }

    /// Encodes `field` into a new vector.
    pub fn encode(&self, field: &str) -> std::result::Result<Vec<f64>, EncodeError> {
        let mut out = vec![0.0; self.encoded_width()];
        self.encode_into(field, &mut out)?;
        Ok(out)
    }
}

/// Exact class lookup, falling back to the integer spelling of numeric text
/// so that "3.0" matches the class "3".
fn lookup(index: &BTreeMap<String, usize>, field: &str) -> std::result::Result<usize, EncodeError> {
    if let Some(&i) = index.get(field) {
        return Ok(i);
    }
    parse_real(field)
        .filter(|x| x.fract() == 0.0)
        .and_then(|x| index.get(&format!("{}", x as i64)).copied())
        .ok_or_else(|| EncodeError::UnknownClass(field.to_string()))
}
