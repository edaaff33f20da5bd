//! Turning raw fields into numeric feature vectors.

pub mod config;
pub mod encoder;
pub mod plan;
pub mod table;

pub use config::{BalancingMode, Encoding, FieldSpec, LoadConfig, NormalizationMode, SplitBounds};
pub use encoder::{ColumnEncoder, EncodeError};
pub use plan::{ColumnEncodeError, EncodingPlan, EncodingPlanBuilder};
pub use table::{RowCounts, TableEncoder};
