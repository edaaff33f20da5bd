//! Approximate distinct-value tracking under a fixed memory budget.

use std::collections::{BTreeMap, HashMap};

/// Default cap on the number of distinct keys.
pub const DEFAULT_MAX_UNIQUE_KEYS: usize = 1000;

/// Default cap on the total bytes of stored keys (64 KiB).
pub const DEFAULT_MAX_UNIQUE_BYTES: usize = 64 * 1024;

/// Counts distinct strings until a key-count or byte budget is exhausted.
///
/// Once either cap is hit the tracker is *full*: new keys are silently
/// ignored while known keys keep counting. `size()` is therefore a lower
/// bound on the true cardinality after [`is_full`](Self::is_full) turns true.
///
/// Bytes are charged when a key is first stored and are not refunded when it
/// is removed, so the budget bounds the total ever stored.
#[derive(Debug, Clone)]
pub struct BoundedUniqueTracker {
    max_keys: usize,
    max_bytes: usize,
    bytes_used: usize,
    counts: HashMap<String, u64>,
    full: bool,
}

impl Default for BoundedUniqueTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNIQUE_KEYS, DEFAULT_MAX_UNIQUE_BYTES)
    }
}

impl BoundedUniqueTracker {
    /// Creates a tracker with the given key-count and byte budgets.
    pub fn new(max_keys: usize, max_bytes: usize) -> Self {
        Self {
            max_keys,
            max_bytes,
            bytes_used: 0,
            counts: HashMap::with_capacity(max_keys.min(DEFAULT_MAX_UNIQUE_KEYS)),
            full: max_keys == 0,
        }
    }

    /// Counts one occurrence of `key`.
    pub fn add(&mut self, key: &str) {
        if self.full {
            return;
        }
        if let Some(count) = self.counts.get_mut(key) {
            *count += 1;
            return;
        }
        if key.len() > self.max_bytes - self.bytes_used {
            self.full = true;
            return;
        }
        self.counts.insert(key.to_string(), 1);
        self.bytes_used += key.len();
        if self.counts.len() >= self.max_keys {
            self.full = true;
        }
    }

    /// Removes one occurrence of `key`, dropping it when its count reaches zero.
    pub fn remove(&mut self, key: &str) {
        if let Some(count) = self.counts.get_mut(key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.counts.remove(key);
            }
        }
    }

    /// Drops `key` regardless of its count.
    pub fn remove_all(&mut self, key: &str) {
        self.counts.remove(key);
    }

    /// Number of distinct keys currently tracked.
    pub fn size(&self) -> usize {
        self.counts.len()
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Occurrence count of `key`, 0 when unknown.
    pub fn count(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Total bytes charged against the budget.
    pub fn bytes_used(&self) -> usize {
        self.bytes_used
    }

    /// `(key, count)` pairs ordered by key.
    pub fn sorted_counts(&self) -> BTreeMap<&str, u64> {
        self.counts.iter().map(|(k, &c)| (k.as_str(), c)).collect()
    }

    /// Unordered view of the counts.
    pub fn raw_counts(&self) -> &HashMap<String, u64> {
        &self.counts
    }

    /// Iterates over the tracked keys in arbitrary order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }
}
