//! Windowed cache: samples bucketed by series fingerprint.
//!
//! Each bucket keeps samples in arrival order. "First" is the oldest
//! insert and "last" the newest, regardless of timestamps. The cache
//! itself is not synchronized; [`RateAggregator`](crate::RateAggregator)
//! wraps it in a mutex.

use std::collections::HashMap;

use telerate_core::{Fingerprint, Sample};

/// Samples accumulated since the last clear.
///
/// Invariant: no bucket is ever empty.
#[derive(Debug, Default)]
pub struct WindowedCache {
    store: HashMap<Fingerprint, Vec<Sample>>,
}

impl WindowedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample to its series bucket, creating the bucket if needed.
    pub fn add(&mut self, sample: Sample) {
        let id = sample.fingerprint();
        self.store.entry(id).or_default().push(sample);
    }

    /// Fingerprints present in this window, sorted ascending.
    pub fn keys(&self) -> Vec<Fingerprint> {
        let mut keys: Vec<Fingerprint> = self.store.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Oldest sample inserted for `key`.
    pub fn first(&self, key: Fingerprint) -> Option<&Sample> {
        self.store.get(&key).and_then(|bucket| bucket.first())
    }

    /// Most recently inserted sample for `key`.
    pub fn last(&self, key: Fingerprint) -> Option<&Sample> {
        self.store.get(&key).and_then(|bucket| bucket.last())
    }

    /// Number of samples buffered for `key`.
    pub fn bucket_len(&self, key: Fingerprint) -> usize {
        self.store.get(&key).map_or(0, Vec::len)
    }

    /// Number of series in this window.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Total samples across all buckets.
    pub fn sample_count(&self) -> usize {
        self.store.values().map(Vec::len).sum()
    }

    /// Discard every bucket.
    pub fn clear(&mut self) {
        self.store = HashMap::new();
    }

    /// Move the whole window out, leaving this cache empty.
    pub fn take(&mut self) -> WindowedCache {
        std::mem::take(self)
    }
}
