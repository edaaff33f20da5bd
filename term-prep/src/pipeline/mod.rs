//! Streaming transforms over encoded rows.
//!
//! Every stage is a [`RecordSource`] that owns its upstream, so a pipeline
//! is a chain of wrappers built from the innermost source outwards:
//!
//! ```rust
//! use term_prep::pipeline::{collect_rows, ClassSampler, MemorySource, Shuffle, Split};
//!
//! let rows = vec![vec![0.5, 1.0], vec![0.1, 2.0], vec![0.7, 2.0], vec![0.3, 1.0]];
//! let balanced = ClassSampler::undersample(MemorySource::new(rows), 1, &[0, 2, 2]).unwrap();
//! let shuffled = Shuffle::with_seed(balanced, 1);
//! let mut train = Split::new(shuffled, 0.0, 50.0).unwrap();
//!
//! assert_eq!(collect_rows(&mut train, 10).unwrap().len(), 2);
//! ```

pub mod sampling;
pub mod shuffle;
pub mod source;
pub mod split;

pub use sampling::{ClassSampler, SamplingStrategy, DEFAULT_BUFFER_SIZE};
pub use shuffle::Shuffle;
pub use source::{collect_rows, Batch, EncodedRow, MemorySource, PassThrough, RecordSource};
pub use split::Split;
