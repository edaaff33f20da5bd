//! Encoder selection and row layout.

use thiserror::Error;
use tracing::{debug, instrument};

use crate::encoding::config::{Encoding, FieldSpec, NormalizationMode};
use crate::encoding::encoder::{ColumnEncoder, EncodeError};
use crate::error::{PrepError, Result};

/// A field of a row failed to encode.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("column {column}: {source}")]
pub struct ColumnEncodeError {
    pub column: usize,
    #[source]
    pub source: EncodeError,
}

/// Chooses an encoder for every column.
#[derive(Debug, Clone, Default)]
pub struct EncodingPlanBuilder {
    normalization: NormalizationMode,
}

impl EncodingPlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scaling used for numeric columns
    pub fn normalization(mut self, mode: NormalizationMode) -> Self {
        self.normalization = mode;
        self
    }

    /// Encoder for a single column.
    pub fn encoder_for(&self, field: &FieldSpec) -> Result<ColumnEncoder> {
        match field.encoding {
            Encoding::Ignore => Ok(ColumnEncoder::Ignore),
            Encoding::Float => self.numeric_encoder(field),
            Encoding::PermuteCategorical | Encoding::PermuteInteger => {
                Self::categorical_encoder(field)
            }
        }
    }

    fn numeric_encoder(&self, field: &FieldSpec) -> Result<ColumnEncoder> {
        if field.stdev == 0.0 || field.min == field.max {
            return Ok(ColumnEncoder::Constant);
        }
        match self.normalization {
            NormalizationMode::None => Ok(ColumnEncoder::numeric_raw(field.mean)),
            NormalizationMode::MinMax => {
                ColumnEncoder::numeric_min_max(field.min, field.max, field.mean)
            }
            NormalizationMode::StdScore => {
                ColumnEncoder::numeric_std_score(field.mean, field.stdev)
            }
        }
    }

    fn categorical_encoder(field: &FieldSpec) -> Result<ColumnEncoder> {
        if field.is_output {
            return Ok(ColumnEncoder::ordinal(field.classes.iter().cloned()));
        }
        let integer =
            field.is_integer_categorical || field.encoding == Encoding::PermuteInteger;
        let mut classes = field.classes.iter();
        match (field.classes.len(), classes.next(), classes.next()) {
            (2, Some(first), Some(second)) => Ok(ColumnEncoder::binary(first, second)),
            (n, _, _) if n > 2 && integer => {
                ColumnEncoder::integer_one_hot(field.min.trunc() as i64, field.max.trunc() as i64)
            }
            _ => Ok(ColumnEncoder::one_hot(field.classes.iter().cloned())),
        }
    }

    /// Builds the plan for `specs`, in column order.
    #[instrument(skip(self, specs), fields(columns = specs.len()))]
    pub fn build(&self, specs: &[FieldSpec]) -> Result<EncodingPlan> {
        let mut encoders = Vec::with_capacity(specs.len());
        let mut input_columns = Vec::new();
        let mut output_columns = Vec::new();
        let mut input_width = 0;
        let mut output_width = 0;

        for (i, field) in specs.iter().enumerate() {
            let encoder = self.encoder_for(field)?;
            debug!(
                column = i,
                encoder = encoder.kind(),
                width = encoder.encoded_width(),
                output = field.is_output,
                "Selected column encoder"
            );
            if field.is_output {
                output_columns.push(i);
                output_width += encoder.encoded_width();
            } else {
                input_columns.push(i);
                input_width += encoder.encoded_width();
            }
            encoders.push(encoder);
        }

        Ok(EncodingPlan {
            encoders,
            input_columns,
            output_columns,
            input_width,
            output_width,
        })
    }
}

/// The fitted encoders of a run and the layout of encoded rows: all input
/// columns in column order, then all output columns.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingPlan {
    encoders: Vec<ColumnEncoder>,
    input_columns: Vec<usize>,
    output_columns: Vec<usize>,
    input_width: usize,
    output_width: usize,
}

impl EncodingPlan {
    pub fn num_columns(&self) -> usize {
        self.encoders.len()
    }

    pub fn encoders(&self) -> &[ColumnEncoder] {
        &self.encoders
    }

    /// Total encoded row width.
    pub fn width(&self) -> usize {
        self.input_width + self.output_width
    }

    pub fn input_width(&self) -> usize {
        self.input_width
    }

    pub fn output_width(&self) -> usize {
        self.output_width
    }

    /// Position of the class label in encoded rows, when the outputs encode
    /// to a single value.
    pub fn label_index(&self) -> Option<usize> {
        (self.output_width == 1).then(|| self.width() - 1)
    }

    /// Label position required by balancing.
    pub fn require_label_index(&self) -> Result<usize> {
        self.label_index().ok_or_else(|| {
            PrepError::invalid_config(format!(
                "balancing needs an output encoded to one value, got width {}",
                self.output_width
            ))
        })
    }

    /// Encodes one row of raw fields into `out` (exactly [`width`](Self::width)
    /// long). Stops at the first failing column, inputs first.
    pub fn encode_row(
        &self,
        fields: &[&str],
        out: &mut [f64],
    ) -> std::result::Result<(), ColumnEncodeError> {
        if out.len() != self.width() || fields.len() < self.encoders.len() {
            return Err(ColumnEncodeError {
                column: fields.len().min(self.encoders.len()),
                source: EncodeError::WidthMismatch {
                    expected: self.width(),
                    actual: out.len(),
                },
            });
        }
        let mut offset = 0;
        for &column in self.input_columns.iter().chain(self.output_columns.iter()) {
            let encoder = &self.encoders[column];
            let end = offset + encoder.encoded_width();
            encoder
                .encode_into(fields[column], &mut out[offset..end])
                .map_err(|source| ColumnEncodeError { column, source })?;
            offset = end;
        }
        Ok(())
    }
}
