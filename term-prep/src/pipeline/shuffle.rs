//! Batch-local shuffling.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::Result;
use crate::pipeline::source::{Batch, RecordSource};

/// Randomly permutes the rows of every batch independently.
///
/// Rows never move between batches: a full shuffle needs the whole table
/// requested as one batch.
pub struct Shuffle<S> {
    upstream: S,
    rng: StdRng,
}

impl<S: RecordSource> Shuffle<S> {
    /// Shuffles with an OS-seeded generator.
    pub fn new(upstream: S) -> Self {
        Self {
            upstream,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Shuffles reproducibly.
    pub fn with_seed(upstream: S, seed: u64) -> Self {
        Self {
            upstream,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<S: RecordSource> RecordSource for Shuffle<S> {
    fn get_next(&mut self, n: usize) -> Result<Option<Batch>> {
        let mut batch = self.upstream.get_next(n)?;
        if let Some(rows) = batch.as_mut() {
            rows.shuffle(&mut self.rng);
        }
        Ok(batch)
    }

    fn size(&self) -> usize {
        self.upstream.size()
    }

    fn name(&self) -> &'static str {
        "shuffle"
    }
}
