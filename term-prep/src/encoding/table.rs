//! Encoded rows read straight from a delimited table.

use std::io::BufRead;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::analyzers::profiler::EMPTY_FIRST_ROW_MESSAGE;
use crate::diagnostics::DiagnosticSink;
use crate::encoding::plan::EncodingPlan;
use crate::error::{PrepError, Result};
use crate::pipeline::source::{Batch, RecordSource};
use crate::sources::{LineReader, TableSource};
use crate::tokenizer::{is_header, Tokenizer, NO_DELIMITER_MESSAGE};

/// How the encoder classified the rows read so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowCounts {
    pub valid_rows: u64,
    pub empty_rows: u64,
    pub invalid_rows: u64,
}

/// The innermost pipeline stage: tokenizes and encodes every data row.
///
/// Rows with fewer fields than configured columns and rows with a field
/// that fails to encode are reported and skipped, as are empty rows.
pub struct TableEncoder {
    reader: LineReader<Box<dyn BufRead + Send>>,
    tokenizer: Tokenizer,
    plan: EncodingPlan,
    diagnostics: Arc<dyn DiagnosticSink>,
    counts: RowCounts,
    lines: usize,
    row: usize,
    line: String,
    done: bool,
}

impl TableEncoder {
    /// Scans `source` once to count its data lines and opens it for encoding.
    #[instrument(skip_all, fields(source = %source.description()))]
    pub fn new(
        source: &dyn TableSource,
        plan: EncodingPlan,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Result<Self> {
        diagnostics.info("Scanning data...");
        let input = source.open().map_err(|e| {
            diagnostics.fatal(&e.to_string());
            e
        })?;
        let mut reader = LineReader::new(input);
        let mut line = String::new();
        if !reader.read_line(&mut line)? || line.trim().is_empty() {
            diagnostics.fatal(EMPTY_FIRST_ROW_MESSAGE);
            return Err(PrepError::input(EMPTY_FIRST_ROW_MESSAGE));
        }
        let tokenizer = match Tokenizer::from_first_line(&line) {
            Ok(t) => t,
            Err(e) => {
                diagnostics.fatal(NO_DELIMITER_MESSAGE);
                return Err(e);
            }
        };
        let first = tokenizer.split(&line);
        let has_header = is_header(&first);
        if first.len() < plan.num_columns() {
            warn!(
                found = first.len(),
                configured = plan.num_columns(),
                "First row has fewer fields than configured columns"
            );
        }

        let mut lines = usize::from(!has_header);
        while reader.read_line(&mut line)? {
            lines += 1;
        }

        let mut reader = LineReader::new(source.open()?);
        let mut row = 0;
        if has_header {
            reader.read_line(&mut line)?;
            row = 1;
        }
        info!(
            data_lines = lines,
            width = plan.width(),
            has_header,
            "Prepared table encoder"
        );

        Ok(Self {
            reader,
            tokenizer,
            plan,
            diagnostics,
            counts: RowCounts::default(),
            lines,
            row,
            line,
            done: false,
        })
    }

    pub fn plan(&self) -> &EncodingPlan {
        &self.plan
    }

    pub fn row_counts(&self) -> RowCounts {
        self.counts
    }

    fn reject(&mut self, col: usize) {
        self.counts.invalid_rows += 1;
        self.diagnostics.data_error(self.row, col);
    }
}

impl RecordSource for TableEncoder {
    fn get_next(&mut self, n: usize) -> Result<Option<Batch>> {
        if self.done {
            return Ok(None);
        }
        let width = self.plan.width();
        let columns = self.plan.num_columns();
        let mut batch = Vec::with_capacity(n.min(4096));

        while batch.len() < n {
            if !self.reader.read_line(&mut self.line)? {
                self.done = true;
                debug!(counts = ?self.counts, "Table encoder exhausted");
                break;
            }
            let fields = self.tokenizer.split(&self.line);
            let outcome = if fields.is_empty() {
                None
            } else if fields.len() < columns {
                Some(Err(fields.len()))
            } else {
                let mut encoded = vec![0.0; width];
                match self.plan.encode_row(&fields, &mut encoded) {
                    Ok(()) => Some(Ok(encoded)),
                    Err(e) if e.source.is_data_error() => Some(Err(e.column)),
                    Err(e) => return Err(e.source.into()),
                }
            };
            match outcome {
                None => self.counts.empty_rows += 1,
                Some(Err(col)) => self.reject(col),
                Some(Ok(encoded)) => {
                    self.counts.valid_rows += 1;
                    batch.push(encoded);
                }
            }
            self.row += 1;
        }

        if batch.is_empty() && self.done {
            Ok(None)
        } else {
            Ok(Some(batch))
        }
    }

    fn size(&self) -> usize {
        self.lines
    }

    fn name(&self) -> &'static str {
        "table_encoder"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingDiagnostics;
    use crate::encoding::config::FieldSpec;
    use crate::encoding::plan::EncodingPlanBuilder;
    use crate::pipeline::source::collect_rows;
    use crate::sources::InMemorySource;

    fn encoder_for(text: &str, fields: &[FieldSpec]) -> (TableEncoder, Arc<CollectingDiagnostics>) {
        let diagnostics = Arc::new(CollectingDiagnostics::new());
        let plan = EncodingPlanBuilder::new().build(fields).unwrap();
        let encoder =
            TableEncoder::new(&InMemorySource::new(text), plan, diagnostics.clone()).unwrap();
        (encoder, diagnostics)
    }

    fn two_columns() -> Vec<FieldSpec> {
        vec![
            FieldSpec::numeric(1.5, 0.5, 1.0, 2.0),
            FieldSpec::categorical(["x", "y"]).output(),
        ]
    }

    #[test]
    fn test_encodes_rows_inputs_first() {
        let (mut encoder, _) = encoder_for("a,b\n1,x\n2,y\n", &two_columns());
        assert_eq!(encoder.size(), 2);
        let rows = collect_rows(&mut encoder, 10).unwrap();
        assert_eq!(rows, vec![vec![1.0, 1.0], vec![2.0, 2.0]]);
        assert_eq!(encoder.row_counts().valid_rows, 2);
    }

    #[test]
    fn test_headerless_first_row_is_data() {
        let (mut encoder, _) = encoder_for("1,x\n2,y\n", &two_columns());
        assert_eq!(encoder.size(), 2);
        assert_eq!(collect_rows(&mut encoder, 1).unwrap().len(), 2);
    }

    #[test]
    fn test_truncated_and_bad_rows_are_skipped() {
        let (mut encoder, diagnostics) =
            encoder_for("a,b\n1,x\n1\n\nq,y\n2,z\n2,y\n", &two_columns());
        let rows = collect_rows(&mut encoder, 2).unwrap();
        assert_eq!(rows, vec![vec![1.0, 1.0], vec![2.0, 2.0]]);
        assert_eq!(
            encoder.row_counts(),
            RowCounts {
                valid_rows: 2,
                empty_rows: 1,
                invalid_rows: 3
            }
        );
        assert_eq!(diagnostics.data_errors(), vec![(2, 1), (4, 0), (5, 1)]);
    }

    #[test]
    fn test_batches_are_bounded_and_fused() {
        let (mut encoder, _) = encoder_for("a,b\n1,x\n2,y\n1,y\n", &two_columns());
        assert_eq!(encoder.get_next(2).unwrap().unwrap().len(), 2);
        assert_eq!(encoder.get_next(2).unwrap().unwrap().len(), 1);
        assert!(encoder.get_next(2).unwrap().is_none());
        assert!(encoder.get_next(2).unwrap().is_none());
    }

    #[test]
    fn test_empty_input_is_fatal() {
        let plan = EncodingPlanBuilder::new().build(&two_columns()).unwrap();
        let result = TableEncoder::new(
            &InMemorySource::new(""),
            plan,
            Arc::new(CollectingDiagnostics::new()),
        );
        assert!(matches!(result, Err(PrepError::Input(_))));
    }
}
