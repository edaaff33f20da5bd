//! # term-prep - Table Profiling and Feature Encoding
//!
//! term-prep turns raw delimited text tables into numeric feature matrices
//! for statistical and machine-learning consumers. It works in two steps,
//! both streaming and with bounded memory:
//!
//! 1. **Profile**: two sequential passes infer every column's type
//!    (`i`, `f`, `S` or `-`), statistics, distinct values and histogram.
//! 2. **Load**: a load configuration derived from the profile picks a
//!    numeric encoder per column; encoded rows flow through optional
//!    balancing, shuffling and splitting stages into a dataset sink.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use term_prep::prelude::*;
//!
//! # fn example() -> term_prep::error::Result<()> {
//! let source = InMemorySource::new("size,color,label\n1.5,red,1\n2.5,blue,2\n3.5,red,2\n");
//!
//! // Profile the table
//! let profile = TableProfiler::default().profile(&source)?;
//! let report = ProfileReport::from(&profile);
//! assert_eq!(report.dtypes[1], SemanticType::Categorical);
//!
//! // Load it with the default configuration: last column is the output
//! let config = LoadConfig::from_report(&report);
//! let mut sink = MemorySink::new();
//! let summary = load_table(
//!     &source,
//!     &config,
//!     &PipelineConfig::default(),
//!     &mut sink,
//!     Arc::new(TracingDiagnostics::default()),
//! )?;
//! assert_eq!(summary.rows_written, 3);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Key Features
//!
//! ### Bounded-memory profiling
//!
//! - **Type inference**: numeric share, cardinality and integer range decide
//!   each column's semantic type, with overridable thresholds
//! - **Approximate uniqueness**: distinct values are tracked under a key and
//!   byte budget and degrade to a lower bound once it is exhausted
//! - **Online statistics**: Welford mean and variance in a single pass
//! - **Histograms**: heuristic bin counts for numeric columns, rank
//!   histograms for everything else
//!
//! ### Encoding
//!
//! Numeric columns are passed through, min-max scaled or standardized;
//! categorical columns become one-hot, binary, ordinal or integer indicator
//! vectors. Outputs always follow inputs in the encoded row.
//!
//! ### Pipeline stages
//!
//! - **Balancing**: undersample, oversample or uniform on the output class
//! - **Shuffle**: batch-local random permutation
//! - **Split**: percentage row ranges that partition the table
//!
//! ## Diagnostics and logging
//!
//! Progress, fatal input problems and rejected cells go to a
//! [`DiagnosticSink`](diagnostics::DiagnosticSink) passed in by the caller.
//! Everything else is logged with `tracing`; see [`logging::setup`].

pub mod analyzers;
pub mod diagnostics;
pub mod encoding;
pub mod error;
pub mod loader;
pub mod logging;
pub mod pipeline;
pub mod prelude;
pub mod sink;
pub mod sources;
pub mod tokenizer;
