//! Two-pass table profiling.
//!
//! The [`TableProfiler`] sweeps the input twice and never holds more than one
//! line in memory:
//!
//! **Pass 1: Type and range discovery**
//! - Detect the separator and whether the first row is a header
//! - Count numeric and non-numeric values per column
//! - Feed running statistics and the bounded uniqueness tracker
//! - Numeric columns get a histogram over the observed range
//!
//! **Pass 2: Validity and histogram fill**
//! - Classify rows as valid, empty or invalid
//! - Fill the numeric histograms; a bad numeric cell invalidates its row
//! - Non-numeric columns get a rank histogram of their distinct values
//!
//! # Example
//!
//! ```rust
//! use term_prep::analyzers::profiler::TableProfiler;
//! use term_prep::sources::InMemorySource;
//!
//! let profiler = TableProfiler::builder()
//!     .categorical_max_unique(50)
//!     .build();
//!
//! let source = InMemorySource::new("a,b\n1,x\n2,y\n,z\n");
//! let profile = profiler.profile(&source).unwrap();
//!
//! assert_eq!(profile.valid_data_rows, 3);
//! assert_eq!(profile.columns[1].semantic_type().tag(), "S");
//! ```

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use crate::analyzers::profile::{
    ColumnProfile, TypeThresholds, CATEGORICAL_MAX_UNIQUE, ERROR_STRING_CAP, INTEGER_MAX_VALUE,
    NUMERIC_RATIO_THRESHOLD,
};
use crate::analyzers::unique::{
    BoundedUniqueTracker, DEFAULT_MAX_UNIQUE_BYTES, DEFAULT_MAX_UNIQUE_KEYS,
};
use crate::diagnostics::{DiagnosticSink, TracingDiagnostics};
use crate::error::{PrepError, Result};
use crate::sources::{LineReader, TableSource};
use crate::tokenizer::{is_header, Separator, Tokenizer, NO_DELIMITER_MESSAGE};

/// Message reported when the input has no usable first row.
pub const EMPTY_FIRST_ROW_MESSAGE: &str =
    "First row is empty, the file is empty or not a delimited table.";

/// Configuration for the two-pass profiler
#[derive(Debug, Clone)]
pub struct ProfilerConfig {
    /// Failed numeric parses sampled per column before type sampling stops
    pub error_string_cap: u64,
    /// Maximum distinct values of a categorical column
    pub categorical_max_unique: usize,
    /// Share of numeric values above which a column is numeric
    pub numeric_ratio: f64,
    /// Largest value of an integer-categorical column
    pub integer_max_value: f64,
    /// Distinct-key cap of each column's uniqueness tracker
    pub max_unique_keys: usize,
    /// Byte budget of each column's uniqueness tracker
    pub max_unique_bytes: usize,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            error_string_cap: ERROR_STRING_CAP,
            categorical_max_unique: CATEGORICAL_MAX_UNIQUE,
            numeric_ratio: NUMERIC_RATIO_THRESHOLD,
            integer_max_value: INTEGER_MAX_VALUE,
            max_unique_keys: DEFAULT_MAX_UNIQUE_KEYS,
            max_unique_bytes: DEFAULT_MAX_UNIQUE_BYTES,
        }
    }
}

impl ProfilerConfig {
    /// Type heuristics handed to every column profile.
    pub fn thresholds(&self) -> TypeThresholds {
        TypeThresholds {
            error_string_cap: self.error_string_cap,
            categorical_max_unique: self.categorical_max_unique,
            numeric_ratio: self.numeric_ratio,
            integer_max_value: self.integer_max_value,
        }
    }

    fn new_column(&self, name: String) -> ColumnProfile {
        ColumnProfile::new(
            name,
            BoundedUniqueTracker::new(self.max_unique_keys, self.max_unique_bytes),
            self.thresholds(),
        )
    }
}

/// Result of profiling one table.
#[derive(Debug, Clone)]
pub struct TableProfile {
    /// One profile per column, in column order
    pub columns: Vec<ColumnProfile>,
    /// Rows that passed pass 2
    pub valid_data_rows: u64,
    /// Rows without any field
    pub empty_rows: u64,
    /// Truncated rows and rows with a bad numeric cell
    pub invalid_rows: u64,
    /// Whether the first row was taken as column names
    pub has_header: bool,
    /// Separator detected on the first row
    pub separator: Separator,
    /// Input size in bytes, 0 when unknown
    pub size_bytes: u64,
    /// Wall-clock time spent on both passes
    pub profiling_time_ms: u64,
}

impl TableProfile {
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Column names in order.
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(ColumnProfile::name).collect()
    }

    /// Looks a column up by name.
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name() == name)
    }
}

/// Builder for TableProfiler
pub struct TableProfilerBuilder {
    config: ProfilerConfig,
    diagnostics: Option<Arc<dyn DiagnosticSink>>,
}

impl TableProfilerBuilder {
    /// Set the number of failed parses sampled before type sampling stops
    pub fn error_string_cap(mut self, cap: u64) -> Self {
        self.config.error_string_cap = cap;
        self
    }

    /// Set the maximum distinct values of a categorical column
    pub fn categorical_max_unique(mut self, max: usize) -> Self {
        self.config.categorical_max_unique = max;
        self
    }

    /// Set the numeric share above which a column is numeric
    pub fn numeric_ratio(mut self, ratio: f64) -> Self {
        self.config.numeric_ratio = ratio;
        self
    }

    /// Set the largest value an integer-categorical column may hold
    pub fn integer_max_value(mut self, max: f64) -> Self {
        self.config.integer_max_value = max;
        self
    }

    /// Set the distinct-key cap of the uniqueness trackers
    pub fn max_unique_keys(mut self, keys: usize) -> Self {
        self.config.max_unique_keys = keys;
        self
    }

    /// Set the byte budget of the uniqueness trackers
    pub fn max_unique_bytes(mut self, bytes: usize) -> Self {
        self.config.max_unique_bytes = bytes;
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ProfilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the sink receiving progress messages and rejected cells
    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    /// Build the TableProfiler
    pub fn build(self) -> TableProfiler {
        TableProfiler {
            config: self.config,
            diagnostics: self
                .diagnostics
                .unwrap_or_else(|| Arc::new(TracingDiagnostics::default())),
        }
    }
}

/// Orchestrates the two profiling passes over a [`TableSource`].
pub struct TableProfiler {
    config: ProfilerConfig,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl Default for TableProfiler {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Column layout established from the first row.
struct Schema {
    tokenizer: Tokenizer,
    has_header: bool,
    names: Vec<String>,
}

#[derive(Default)]
struct RowCounters {
    valid: u64,
    empty: u64,
    invalid: u64,
}

impl TableProfiler {
    /// Create a new builder for TableProfiler
    pub fn builder() -> TableProfilerBuilder {
        TableProfilerBuilder {
            config: ProfilerConfig::default(),
            diagnostics: None,
        }
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Profiles every column of `source`.
    ///
    /// Fails only when no schema can be established (missing or empty first
    /// row, no separator) or when reading the input fails. Malformed rows are
    /// counted and reported, never fatal.
    #[instrument(skip(self, source), fields(source = %source.description()))]
    pub fn profile(&self, source: &dyn TableSource) -> Result<TableProfile> {
        let start_time = Instant::now();
        info!("Starting two-pass table profiling");

        let schema = self.read_schema(source)?;
        let mut columns: Vec<ColumnProfile> = schema
            .names
            .iter()
            .map(|name| self.config.new_column(name.clone()))
            .collect();

        self.diagnostics.info("Analyzing data phase 1...");
        self.pass1(source, &schema, &mut columns)?;
        for column in &mut columns {
            column.finish_pass1()?;
        }

        self.diagnostics.info("Analyzing data phase 2...");
        let counters = self.pass2(source, &schema, &mut columns)?;
        for column in &mut columns {
            column.finish_pass2()?;
        }

        let profiling_time_ms = start_time.elapsed().as_millis() as u64;
        info!(
            columns = columns.len(),
            valid_rows = counters.valid,
            empty_rows = counters.empty,
            invalid_rows = counters.invalid,
            has_header = schema.has_header,
            time_ms = profiling_time_ms,
            "Completed table profiling"
        );

        Ok(TableProfile {
            columns,
            valid_data_rows: counters.valid,
            empty_rows: counters.empty,
            invalid_rows: counters.invalid,
            has_header: schema.has_header,
            separator: schema.tokenizer.separator(),
            size_bytes: source.size_bytes().unwrap_or(0),
            profiling_time_ms,
        })
    }

    fn fatal(&self, msg: &str) -> PrepError {
        self.diagnostics.fatal(msg);
        PrepError::input(msg)
    }

    fn read_schema(&self, source: &dyn TableSource) -> Result<Schema> {
        let input = source.open().map_err(|e| {
            self.diagnostics.fatal(&e.to_string());
            e
        })?;
        let mut reader = LineReader::new(input);
        let mut line = String::new();
        if !reader.read_line(&mut line)? || line.trim().is_empty() {
            return Err(self.fatal(EMPTY_FIRST_ROW_MESSAGE));
        }
        let tokenizer = match Tokenizer::from_first_line(&line) {
            Ok(t) => t,
            Err(_) => return Err(self.fatal(NO_DELIMITER_MESSAGE)),
        };
        let fields = tokenizer.split(&line);
        if fields.is_empty() {
            return Err(self.fatal(EMPTY_FIRST_ROW_MESSAGE));
        }

        let has_header = is_header(&fields);
        let names = if has_header {
            fields
                .iter()
                .enumerate()
                .map(|(i, f)| {
                    if f.is_empty() {
                        (i + 1).to_string()
                    } else {
                        f.to_string()
                    }
                })
                .collect()
        } else {
            (1..=fields.len()).map(|i| i.to_string()).collect()
        };
        debug!(
            separator = ?tokenizer.separator(),
            columns = fields.len(),
            has_header,
            "Detected table layout"
        );
        Ok(Schema {
            tokenizer,
            has_header,
            names,
        })
    }

    fn pass1(
        &self,
        source: &dyn TableSource,
        schema: &Schema,
        columns: &mut [ColumnProfile],
    ) -> Result<()> {
        let width = columns.len();
        let mut reader = LineReader::new(source.open()?);
        let mut line = String::new();
        let mut skipped = 0u64;

        if schema.has_header {
            reader.read_line(&mut line)?;
        }
        while reader.read_line(&mut line)? {
            let fields = schema.tokenizer.split(&line);
            if fields.len() < width {
                skipped += 1;
                continue;
            }
            for (column, field) in columns.iter_mut().zip(fields.iter()) {
                column.observe(field);
            }
        }
        debug!(skipped_rows = skipped, "Finished profiling pass 1");
        Ok(())
    }

    fn pass2(
        &self,
        source: &dyn TableSource,
        schema: &Schema,
        columns: &mut [ColumnProfile],
    ) -> Result<RowCounters> {
        let width = columns.len();
        let mut reader = LineReader::new(source.open()?);
        let mut line = String::new();
        let mut counters = RowCounters::default();
        let mut row = 0usize;

        if schema.has_header {
            reader.read_line(&mut line)?;
            row += 1;
        }
        while reader.read_line(&mut line)? {
            let current = row;
            row += 1;
            let fields = schema.tokenizer.split(&line);
            if fields.is_empty() {
                counters.empty += 1;
                continue;
            }
            if fields.len() < width {
                counters.invalid += 1;
                self.diagnostics.data_error(current, fields.len());
                continue;
            }

            let failed = columns
                .iter_mut()
                .zip(fields.iter())
                .position(|(column, field)| !column.observe_pass2(field));
            match failed {
                None => counters.valid += 1,
                Some(col) => {
                    for (column, field) in columns.iter_mut().zip(fields.iter()) {
                        column.retract(field);
                    }
                    counters.invalid += 1;
                    self.diagnostics.data_error(current, col);
                }
            }
        }
        if counters.invalid > 0 {
            warn!(invalid_rows = counters.invalid, "Rows rejected during profiling");
        }
        Ok(counters)
    }
}
