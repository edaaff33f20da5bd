//! Column profiling.
//!
//! Building blocks ([`OnlineStats`], [`BoundedUniqueTracker`], [`Histogram`])
//! are combined per column in a [`ColumnProfile`]; the [`TableProfiler`]
//! drives them over a whole table and [`ProfileReport`] turns the result into
//! the JSON profile document.

pub mod histogram;
pub mod online_stats;
pub mod profile;
pub mod profiler;
pub mod report;
pub mod unique;

pub use histogram::{heuristic_bin_count, Histogram};
pub use online_stats::OnlineStats;
pub use profile::{ColumnProfile, SemanticType, TypeThresholds};
pub use profiler::{ProfilerConfig, TableProfile, TableProfiler, TableProfilerBuilder};
pub use report::{LastColumnInfo, ProfileReport};
pub use unique::BoundedUniqueTracker;
