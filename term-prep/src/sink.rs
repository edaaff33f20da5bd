//! Destinations for encoded rows.

use std::io::Write;

use crate::error::Result;

/// Append-only destination of encoded rows.
///
/// `flush` may be called any number of times, including with nothing
/// pending.
pub trait DatasetSink {
    /// Stores one row, split into its input and output values.
    fn append(&mut self, inputs: &[f64], outputs: &[f64]) -> Result<()>;

    /// Persists everything appended so far.
    fn flush(&mut self) -> Result<()>;
}

impl<T: DatasetSink + ?Sized> DatasetSink for &mut T {
    fn append(&mut self, inputs: &[f64], outputs: &[f64]) -> Result<()> {
        (**self).append(inputs, outputs)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Keeps rows in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySink {
    pub inputs: Vec<Vec<f64>>,
    pub outputs: Vec<Vec<f64>>,
    pub flushes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

impl DatasetSink for MemorySink {
    fn append(&mut self, inputs: &[f64], outputs: &[f64]) -> Result<()> {
        self.inputs.push(inputs.to_vec());
        self.outputs.push(outputs.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// Rows buffered before a delimited sink writes them out.
pub const DEFAULT_CHUNK_ROWS: usize = 1000;

/// Writes rows as delimited text: input values, then output values.
pub struct DelimitedSink<W: Write> {
    writer: W,
    delimiter: char,
    chunk_rows: usize,
    pending: String,
    pending_rows: usize,
    written_rows: u64,
}

impl<W: Write> DelimitedSink<W> {
    /// Comma-separated sink.
    pub fn new(writer: W) -> Self {
        Self::with_delimiter(writer, ',')
    }

    pub fn with_delimiter(writer: W, delimiter: char) -> Self {
        Self {
            writer,
            delimiter,
            chunk_rows: DEFAULT_CHUNK_ROWS,
            pending: String::new(),
            pending_rows: 0,
            written_rows: 0,
        }
    }

    /// Set how many rows are buffered between writes
    pub fn chunk_rows(mut self, rows: usize) -> Self {
        self.chunk_rows = rows.max(1);
        self
    }

    /// Rows handed to the writer so far.
    pub fn written_rows(&self) -> u64 {
        self.written_rows
    }

    /// Flushes and returns the writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.writer)
    }

    fn write_pending(&mut self) -> Result<()> {
        if self.pending_rows == 0 {
            return Ok(());
        }
        self.writer.write_all(self.pending.as_bytes())?;
        self.written_rows += self.pending_rows as u64;
        self.pending.clear();
        self.pending_rows = 0;
        Ok(())
    }
}

impl<W: Write> DatasetSink for DelimitedSink<W> {
    fn append(&mut self, inputs: &[f64], outputs: &[f64]) -> Result<()> {
        for (i, value) in inputs.iter().chain(outputs.iter()).enumerate() {
            if i > 0 {
                self.pending.push(self.delimiter);
            }
            self.pending.push_str(&value.to_string());
        }
        self.pending.push('\n');
        self.pending_rows += 1;
        if self.pending_rows >= self.chunk_rows {
            self.write_pending()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.write_pending()?;
        self.writer.flush()?;
        Ok(())
    }
}
