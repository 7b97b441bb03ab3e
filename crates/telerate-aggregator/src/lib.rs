//! telerate-aggregator: windowed rate-of-change aggregation.
//!
//! Buffers samples per series between flushes and, on each flush, emits
//! one record per series in which configured counters are replaced by
//! their per-second rate over the window.
//!
//! # Architecture
//!
//! ```text
//! RateAggregator
//!   ├── add()    ← called per collected sample, any thread
//!   ├── push()   → RateEngine::flush() → Sink::add_fields()
//!   ├── reset()  → WindowedCache::clear()
//!   └── drain()  push + reset under one lock acquisition
//!
//! Flusher
//!   └── run() → drain() every period, final drain on shutdown
//! ```

pub mod aggregator;
pub mod cache;
pub mod engine;
pub mod flusher;
pub mod sink;

pub use aggregator::RateAggregator;
pub use cache::WindowedCache;
pub use engine::RateEngine;
pub use flusher::Flusher;
pub use sink::{Accumulator, Sink};
