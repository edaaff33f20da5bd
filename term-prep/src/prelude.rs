//! Prelude for commonly used types and traits in term-prep.

pub use crate::analyzers::{
    ColumnProfile, ProfileReport, ProfilerConfig, SemanticType, TableProfile, TableProfiler,
};
pub use crate::diagnostics::{
    CollectingDiagnostics, Diagnostic, DiagnosticSink, JsonLinesDiagnostics, TracingDiagnostics,
};
pub use crate::encoding::{
    BalancingMode, ColumnEncoder, Encoding, EncodingPlanBuilder, FieldSpec, LoadConfig,
    NormalizationMode, TableEncoder,
};
pub use crate::error::{PrepError, Result};
pub use crate::loader::{load_table, LoadSummary, PipelineConfig};
pub use crate::logging::LogConfig;
pub use crate::pipeline::{ClassSampler, MemorySource, RecordSource, SamplingStrategy, Shuffle, Split};
pub use crate::sink::{DatasetSink, DelimitedSink, MemorySink};
pub use crate::sources::{FileSource, InMemorySource, TableSource};
