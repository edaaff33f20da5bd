//! Class balancing on the label column.
//!
//! Class counts are indexed by label, with index 0 reserved for rows whose
//! label is missing. Labels are read from the encoded row by truncating the
//! value at the label index.

use tracing::{debug, instrument};

use crate::error::{PrepError, Result};
use crate::pipeline::source::{Batch, EncodedRow, Pending, RecordSource};

/// Default number of rows pulled from upstream at a time.
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

/// How classes are brought to a common row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplingStrategy {
    /// Keep the first `min(counts)` rows of every class.
    Undersample,
    /// Replicate every class up to `max(counts)` rows.
    Oversample,
    /// Bring every class to the mean class count: larger classes are cut,
    /// smaller ones replicated.
    Uniform,
}

impl SamplingStrategy {
    pub fn name(self) -> &'static str {
        match self {
            SamplingStrategy::Undersample => "undersample",
            SamplingStrategy::Oversample => "oversample",
            SamplingStrategy::Uniform => "uniform",
        }
    }
}

/// Per-class emission rule.
#[derive(Debug, Clone, PartialEq)]
enum Quota {
    /// Rows of this class are dropped.
    Drop,
    /// The first `limit` rows are kept once.
    Cap { limit: u64, seen: u64 },
    /// The first `threshold` rows are emitted `multiplier` times, the rest
    /// `multiplier + 1` times, which spreads the remainder over the class.
    Replicate {
        multiplier: u64,
        threshold: u64,
        seen: u64,
    },
}

impl Quota {
    fn cap(limit: u64) -> Self {
        Quota::Cap { limit, seen: 0 }
    }

    fn replicate(count: u64, target: u64) -> Self {
        if count == 0 {
            return Quota::Drop;
        }
        let multiplier = target / count;
        Quota::Replicate {
            multiplier,
            threshold: count * (multiplier + 1) - target,
            seen: 0,
        }
    }

    /// Copies to emit for the next row of the class.
    fn copies(&mut self) -> u64 {
        match self {
            Quota::Drop => 0,
            Quota::Cap { limit, seen } => {
                if *seen < *limit {
                    *seen += 1;
                    1
                } else {
                    0
                }
            }
            Quota::Replicate {
                multiplier,
                threshold,
                seen,
            } => {
                let copies = if *seen < *threshold {
                    *multiplier
                } else {
                    *multiplier + 1
                };
                *seen += 1;
                copies
            }
        }
    }
}

/// Resamples its upstream so that every class reaches the same row count.
pub struct ClassSampler<S> {
    upstream: S,
    strategy: SamplingStrategy,
    label_index: usize,
    quotas: Vec<Quota>,
    target: u64,
    buffer_size: usize,
    pending: Pending,
}

impl<S: RecordSource> ClassSampler<S> {
    /// Creates a sampler. `class_counts[0]` is the reserved missing-value
    /// class; at least one real class is required.
    #[instrument(skip(upstream, class_counts), fields(classes = class_counts.len()))]
    pub fn new(
        upstream: S,
        strategy: SamplingStrategy,
        label_index: usize,
        class_counts: &[u64],
        buffer_size: usize,
    ) -> Result<Self> {
        let counts = match class_counts {
            [_, rest @ ..] if !rest.is_empty() => rest,
            _ => {
                return Err(PrepError::invalid_config(
                    "balancing needs the counts of at least one class",
                ))
            }
        };
        let target = match strategy {
            SamplingStrategy::Undersample => counts.iter().copied().min().unwrap_or(0),
            SamplingStrategy::Oversample => counts.iter().copied().max().unwrap_or(0),
            SamplingStrategy::Uniform => counts.iter().sum::<u64>() / counts.len() as u64,
        };

        let mut quotas = Vec::with_capacity(class_counts.len());
        quotas.push(Quota::Drop);
        for &count in counts {
            let quota = match strategy {
                SamplingStrategy::Undersample => Quota::cap(target),
                SamplingStrategy::Oversample => Quota::replicate(count, target),
                SamplingStrategy::Uniform if count >= target => Quota::cap(target),
                SamplingStrategy::Uniform => Quota::replicate(count, target),
            };
            quotas.push(quota);
        }
        debug!(
            strategy = strategy.name(),
            target,
            label_index,
            "Created class sampler"
        );

        Ok(Self {
            upstream,
            strategy,
            label_index,
            quotas,
            target,
            buffer_size: buffer_size.max(1),
            pending: Pending::new(),
        })
    }

    pub fn undersample(upstream: S, label_index: usize, class_counts: &[u64]) -> Result<Self> {
        Self::new(
            upstream,
            SamplingStrategy::Undersample,
            label_index,
            class_counts,
            DEFAULT_BUFFER_SIZE,
        )
    }

    pub fn oversample(upstream: S, label_index: usize, class_counts: &[u64]) -> Result<Self> {
        Self::new(
            upstream,
            SamplingStrategy::Oversample,
            label_index,
            class_counts,
            DEFAULT_BUFFER_SIZE,
        )
    }

    pub fn uniform(upstream: S, label_index: usize, class_counts: &[u64]) -> Result<Self> {
        Self::new(
            upstream,
            SamplingStrategy::Uniform,
            label_index,
            class_counts,
            DEFAULT_BUFFER_SIZE,
        )
    }

    pub fn strategy(&self) -> SamplingStrategy {
        self.strategy
    }

    /// Rows every class is brought to.
    pub fn target(&self) -> u64 {
        self.target
    }
}

fn label_of(row: &EncodedRow, index: usize) -> Result<usize> {
    let value = row.get(index).copied().ok_or_else(|| {
        PrepError::internal(format!(
            "label index {index} outside encoded row of width {}",
            row.len()
        ))
    })?;
    // negative and NaN labels saturate to the missing class
    Ok(value.trunc() as usize)
}

impl<S: RecordSource> RecordSource for ClassSampler<S> {
    fn get_next(&mut self, n: usize) -> Result<Option<Batch>> {
        let upstream = &mut self.upstream;
        let quotas = &mut self.quotas;
        let label_index = self.label_index;
        let buffer_size = self.buffer_size;

        self.pending.next_batch(n, |pending| {
            let Some(batch) = upstream.get_next(buffer_size)? else {
                return Ok(false);
            };
            for row in batch {
                let label = label_of(&row, label_index)?;
                let copies = quotas.get_mut(label).map_or(0, Quota::copies);
                for _ in 1..copies {
                    pending.push(row.clone());
                }
                if copies > 0 {
                    pending.push(row);
                }
            }
            Ok(true)
        })
    }

    fn size(&self) -> usize {
        (self.target * (self.quotas.len() as u64 - 1)) as usize
    }

    fn name(&self) -> &'static str {
        self.strategy.name()
    }
}
