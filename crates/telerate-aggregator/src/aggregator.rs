//! Rate aggregator: the windowed cache and rate engine behind one lock.
//!
//! Producers call [`RateAggregator::add`] from any thread. A single
//! scheduler calls [`RateAggregator::push`] then [`RateAggregator::reset`]
//! each period, or [`RateAggregator::drain`] to do both atomically.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use telerate_core::{ConfigResult, DerivedRecord, RateConfig, RateSpec, Sample};

use crate::cache::WindowedCache;
use crate::engine::RateEngine;
use crate::sink::Sink;

/// Computes per-series rates over each flush window.
///
/// # Concurrency
///
/// One coarse `std::sync::Mutex` covers the cache. Lock hold time for
/// `add` is a single hash map insert. `drain` swaps the window out under
/// the lock and computes rates after releasing it, so producers are
/// never blocked on rate computation.
#[derive(Debug, Default)]
pub struct RateAggregator {
    cache: Mutex<WindowedCache>,
    engine: RateEngine,
}

impl RateAggregator {
    pub fn new(spec: RateSpec) -> Self {
        Self {
            cache: Mutex::new(WindowedCache::new()),
            engine: RateEngine::new(spec),
        }
    }

    /// Build from a validated config.
    pub fn from_config(config: &RateConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::new(config.rate_spec()))
    }

    /// Buffer a sample for the current window.
    pub fn add(&self, sample: Sample) {
        self.lock().add(sample);
    }

    /// Emit one derived record per series without clearing the window.
    ///
    /// Returns the number of records handed to the sink.
    pub fn push<S: Sink + ?Sized>(&self, sink: &mut S) -> usize {
        let records = {
            let cache = self.lock();
            self.engine.flush(&cache)
        };
        emit(records, sink)
    }

    /// Discard the current window.
    pub fn reset(&self) {
        self.lock().clear();
    }

    /// Take the current window, emit its records, and start a new one.
    ///
    /// Samples added while rates are being computed land in the next
    /// window.
    pub fn drain<S: Sink + ?Sized>(&self, sink: &mut S) -> usize {
        let window = self.lock().take();
        let records = self.engine.flush(&window);
        emit(records, sink)
    }

    /// Samples buffered in the current window.
    pub fn pending(&self) -> usize {
        self.lock().sample_count()
    }

    /// Series present in the current window.
    pub fn series(&self) -> usize {
        self.lock().len()
    }

    // A producer that panicked mid-call cannot leave a partial append
    // behind, so a poisoned window is still consistent.
    fn lock(&self) -> MutexGuard<'_, WindowedCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn emit<S: Sink + ?Sized>(records: Vec<DerivedRecord>, sink: &mut S) -> usize {
    let count = records.len();
    for record in records {
        sink.add_fields(&record.name, record.fields, record.tags);
    }
    if count > 0 {
        debug!(records = count, "rate records emitted");
    }
    count
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use telerate_core::{secs, FieldValue, Fields, Tags};

    use super::*;
    use crate::sink::Accumulator;

    fn m1(at: i64, fields: &[(&str, FieldValue)]) -> Sample {
        let mut s = Sample::new("m1", secs(at)).with_tag("foo", "bar");
        for (k, v) in fields {
            s = s.with_field(*k, v.clone());
        }
        s
    }

    fn foo_bar() -> Tags {
        let mut tags = Tags::new();
        tags.insert("foo".to_string(), "bar".to_string());
        tags
    }

    #[test]
    fn rate_with_period() {
        use FieldValue::{Boolean, Float, Integer};

        let aggregator = RateAggregator::new(
            [("m1", vec!["a", "b", "f", "g"])].into_iter().collect(),
        );

        aggregator.add(m1(
            0,
            &[
                ("a", Integer(1)),
                ("b", Integer(1)),
                ("c", Integer(1)),
                ("d", Integer(1)),
                ("e", Integer(1)),
                ("f", Float(1.0)),
                ("g", Float(1.0)),
                ("h", Float(2.0)),
                ("i", Float(2.0)),
                ("j", Float(3.0)),
            ],
        ));
        aggregator.add(m1(
            120,
            &[
                ("a", Integer(1)),
                ("b", Integer(3)),
                ("c", Integer(3)),
                ("d", Integer(3)),
                ("e", Integer(3)),
                ("f", Float(240.0)),
                ("g", Float(240.0)),
                ("h", Float(1.0)),
                ("i", Float(1.0)),
                ("j", Float(1.0)),
                ("k", Float(200.0)),
                ("ignoreme", "string".into()),
                ("andme", Boolean(true)),
            ],
        ));
        aggregator.add(m1(
            120,
            &[
                ("a", Integer(2)),
                ("b", Integer(4)),
                ("c", Integer(5)),
                ("d", Integer(10)),
                ("e", Integer(15)),
                ("f", Float(212.0)),
                ("g", Float(2645.0)),
                ("h", Float(11.0)),
                ("i", Float(111.0)),
                ("j", Float(1665.0)),
                ("k", Float(211.0)),
                ("ignoreme", "string".into()),
                ("andme", Boolean(true)),
            ],
        ));

        let mut acc = Accumulator::new();
        assert_eq!(aggregator.push(&mut acc), 1);

        let expected: Fields = [
            ("a_per_second", Float(0.008333333333333333)),
            ("andme", Boolean(true)),
            ("b_per_second", Float(0.025)),
            ("c", Integer(5)),
            ("d", Integer(10)),
            ("e", Integer(15)),
            ("f_per_second", Float(1.7583333333333333)),
            ("g_per_second", Float(22.033333333333335)),
            ("h", Float(11.0)),
            ("i", Float(111.0)),
            ("ignoreme", "string".into()),
            ("j", Float(1665.0)),
            ("k", Float(211.0)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let record = acc.find("m1", &foo_bar()).unwrap();
        assert_eq!(record.fields, expected);
    }

    #[test]
    fn push_is_idempotent_until_reset() {
        let aggregator = RateAggregator::new([("m1", vec!["a"])].into_iter().collect());
        aggregator.add(m1(0, &[("a", FieldValue::Integer(0))]));
        aggregator.add(m1(10, &[("a", FieldValue::Integer(5))]));

        let mut first = Accumulator::new();
        let mut second = Accumulator::new();
        aggregator.push(&mut first);
        aggregator.push(&mut second);
        assert_eq!(first.records(), second.records());

        aggregator.reset();
        assert_eq!(aggregator.pending(), 0);
        assert_eq!(aggregator.series(), 0);

        let mut after = Accumulator::new();
        assert_eq!(aggregator.push(&mut after), 0);
        assert!(after.is_empty());
    }

    #[test]
    fn drain_empties_window() {
        let aggregator = RateAggregator::new(RateSpec::default());
        aggregator.add(m1(0, &[]));
        aggregator.add(Sample::new("m2", 0));
        assert_eq!(aggregator.series(), 2);

        let mut acc = Accumulator::new();
        assert_eq!(aggregator.drain(&mut acc), 2);
        assert_eq!(aggregator.pending(), 0);
        assert_eq!(aggregator.drain(&mut acc), 0);
        assert_eq!(acc.len(), 2);
    }

    #[test]
    fn from_config_rejects_invalid() {
        let mut config = RateConfig::default();
        assert!(RateAggregator::from_config(&config).is_ok());

        config.period = "never".to_string();
        assert!(RateAggregator::from_config(&config).is_err());
    }

    #[test]
    fn independent_instances() {
        let a = RateAggregator::default();
        let b = RateAggregator::default();
        a.add(Sample::new("m", 0));
        assert_eq!(a.pending(), 1);
        assert_eq!(b.pending(), 0);
    }

    #[test]
    fn survives_poisoned_lock() {
        let aggregator = Arc::new(RateAggregator::default());
        aggregator.add(Sample::new("m", 0));

        let poisoner = Arc::clone(&aggregator);
        let _ = thread::spawn(move || {
            let _guard = poisoner.cache.lock().unwrap();
            panic!("poison the window");
        })
        .join();

        aggregator.add(Sample::new("m", 1));
        assert_eq!(aggregator.pending(), 2);
    }
}
