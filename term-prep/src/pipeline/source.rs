//! Pull-based sources of encoded rows.

use std::collections::VecDeque;

use crate::error::Result;

/// One encoded row: input values followed by output values.
pub type EncodedRow = Vec<f64>;

/// Rows returned by one pull.
pub type Batch = Vec<EncodedRow>;

/// A stream of encoded rows pulled in batches.
///
/// `get_next(n)` returns at most `n` rows and `None` once the stream is
/// exhausted. After the first `None` every further call returns `None`.
/// A batch is empty only when `n` is 0.
pub trait RecordSource: Send {
    /// Pulls up to `n` rows.
    fn get_next(&mut self, n: usize) -> Result<Option<Batch>>;

    /// Best-effort total number of rows, 0 when unknown.
    fn size(&self) -> usize;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn get_next(&mut self, n: usize) -> Result<Option<Batch>> {
        (**self).get_next(n)
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<S: RecordSource + ?Sized> RecordSource for &mut S {
    fn get_next(&mut self, n: usize) -> Result<Option<Batch>> {
        (**self).get_next(n)
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Forwards everything from its upstream untouched.
#[derive(Debug)]
pub struct PassThrough<S> {
    upstream: S,
}

impl<S: RecordSource> PassThrough<S> {
    pub fn new(upstream: S) -> Self {
        Self { upstream }
    }

    pub fn into_inner(self) -> S {
        self.upstream
    }
}

impl<S: RecordSource> RecordSource for PassThrough<S> {
    fn get_next(&mut self, n: usize) -> Result<Option<Batch>> {
        self.upstream.get_next(n)
    }

    fn size(&self) -> usize {
        self.upstream.size()
    }

    fn name(&self) -> &'static str {
        "pass_through"
    }
}

/// Rows held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    rows: VecDeque<EncodedRow>,
    size: usize,
}

impl MemorySource {
    pub fn new(rows: Vec<EncodedRow>) -> Self {
        Self {
            size: rows.len(),
            rows: rows.into(),
        }
    }

    /// Rows not yet pulled.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl RecordSource for MemorySource {
    fn get_next(&mut self, n: usize) -> Result<Option<Batch>> {
        if self.rows.is_empty() {
            return Ok(None);
        }
        let take = n.min(self.rows.len());
        Ok(Some(self.rows.drain(..take).collect()))
    }

    fn size(&self) -> usize {
        self.size
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Queue of rows produced ahead of demand by the resampling decorators.
///
/// Upstream is pulled in fixed-size chunks and the results are handed out
/// in whatever batch size the caller asks for.
#[derive(Debug)]
pub(crate) struct Pending {
    rows: VecDeque<EncodedRow>,
    exhausted: bool,
}

impl Pending {
    pub(crate) fn new() -> Self {
        Self {
            rows: VecDeque::new(),
            exhausted: false,
        }
    }

    pub(crate) fn push(&mut self, row: EncodedRow) {
        self.rows.push_back(row);
    }

    /// Refills from `upstream` with `refill` until at least `n` rows are
    /// queued or upstream is exhausted, then hands out up to `n` rows.
    pub(crate) fn next_batch<F>(&mut self, n: usize, mut refill: F) -> Result<Option<Batch>>
    where
        F: FnMut(&mut Self) -> Result<bool>,
    {
        while self.rows.len() < n.max(1) && !self.exhausted {
            if !refill(self)? {
                self.exhausted = true;
            }
        }
        if self.rows.is_empty() && self.exhausted {
            return Ok(None);
        }
        let take = n.min(self.rows.len());
        Ok(Some(self.rows.drain(..take).collect()))
    }
}

/// Pulls everything left in `source` in batches of `batch_size`.
pub fn collect_rows<S: RecordSource + ?Sized>(
    source: &mut S,
    batch_size: usize,
) -> Result<Vec<EncodedRow>> {
    let mut rows = Vec::new();
    while let Some(batch) = source.get_next(batch_size.max(1))? {
        rows.extend(batch);
    }
    Ok(rows)
}
