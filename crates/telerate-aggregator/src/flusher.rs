//! Flusher: background task that drains the aggregator once per period.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::aggregator::RateAggregator;
use crate::sink::Sink;

/// Periodic flush-and-clear trigger for one [`RateAggregator`].
pub struct Flusher {
    aggregator: Arc<RateAggregator>,
    period: Duration,
}

impl Flusher {
    pub fn new(aggregator: Arc<RateAggregator>, period: Duration) -> Self {
        Self { aggregator, period }
    }

    /// Drain into `sink` every period until shutdown, then drain once more
    /// and hand the sink back.
    ///
    /// The first flush happens one full period after start.
    pub async fn run<S: Sink>(self, mut sink: S, mut shutdown: watch::Receiver<bool>) -> S {
        info!(period_ms = self.period.as_millis() as u64, "rate flusher started");

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let emitted = self.aggregator.drain(&mut sink);
                    debug!(records = emitted, "rate window flushed");
                }
                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown too.
                    if changed.is_ok() && !*shutdown.borrow() {
                        continue;
                    }
                    info!("rate flusher shutting down");
                    // Final flush so the partial window is not lost.
                    let emitted = self.aggregator.drain(&mut sink);
                    debug!(records = emitted, "final rate window flushed");
                    break;
                }
            }
        }

        sink
    }
}
