//! Percentage-based row ranges.

use tracing::debug;

use crate::error::{PrepError, Result};
use crate::pipeline::source::{Batch, RecordSource};

/// Rows discarded per upstream pull while skipping to the range start.
pub const SKIP_CHUNK_SIZE: usize = 1000;

/// Emits the rows between `start` and `end` percent of the upstream size.
///
/// Bounds are computed once from upstream's `size()`:
/// `first = floor(size * start / 100)`, `last = floor(size * end / 100)`.
/// Adjacent ranges over the same upstream therefore partition it.
pub struct Split<S> {
    upstream: S,
    first: usize,
    last: usize,
    position: usize,
    done: bool,
}

impl<S: RecordSource> Split<S> {
    /// Requires `0 <= start < end <= 100`.
    pub fn new(upstream: S, start: f64, end: f64) -> Result<Self> {
        if !(0.0..=100.0).contains(&start) || !(0.0..=100.0).contains(&end) || end <= start {
            return Err(PrepError::invalid_config(format!(
                "split needs 0 <= start < end <= 100, got start {start} and end {end}"
            )));
        }
        let total = upstream.size() as f64;
        let first = (total * start / 100.0).floor() as usize;
        let last = (total * end / 100.0).floor() as usize;
        debug!(start, end, first, last, "Created split");
        Ok(Self {
            upstream,
            first,
            last,
            position: 0,
            done: false,
        })
    }

    /// Upstream row range `[first, last)` emitted by this split.
    pub fn bounds(&self) -> (usize, usize) {
        (self.first, self.last)
    }

    fn skip_to_first(&mut self) -> Result<()> {
        while self.position < self.first {
            let chunk = SKIP_CHUNK_SIZE.min(self.first - self.position);
            match self.upstream.get_next(chunk)? {
                Some(rows) => self.position += rows.len(),
                None => {
                    self.done = true;
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

impl<S: RecordSource> RecordSource for Split<S> {
    fn get_next(&mut self, n: usize) -> Result<Option<Batch>> {
        if !self.done {
            self.skip_to_first()?;
        }
        if self.done || self.position >= self.last {
            self.done = true;
            return Ok(None);
        }
        let want = n.min(self.last - self.position);
        match self.upstream.get_next(want)? {
            Some(rows) => {
                self.position += rows.len();
                Ok(Some(rows))
            }
            None => {
                self.done = true;
                Ok(None)
            }
        }
    }

    fn size(&self) -> usize {
        self.last - self.first
    }

    fn name(&self) -> &'static str {
        "split"
    }
}
