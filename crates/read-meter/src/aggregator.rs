//! Rate meter: drains samples and publishes one snapshot per second.

use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::sample::SampleReceiver;
use crate::store::{MetricsSnapshot, MetricsStore};
use crate::window::WindowAccumulator;

/// Length of one aggregation window.
pub const WINDOW_PERIOD: Duration = Duration::from_secs(1);

/// Single long-lived consumer of the sample channel.
pub struct RateAggregator {
    samples: SampleReceiver,
    store: MetricsStore,
    period: Duration,
}

impl RateAggregator {
    pub fn new(samples: SampleReceiver, store: MetricsStore) -> Self {
        Self {
            samples,
            store,
            period: WINDOW_PERIOD,
        }
    }

    /// Run the aggregation loop for the life of the process.
    ///
    /// Waits on whichever comes first: a sample, which is folded into the
    /// current window, or the window tick, which publishes the window and
    /// starts a fresh one. A window with no samples publishes all zeros.
    pub async fn run_forever(mut self) {
        info!(
            window_ms = self.period.as_millis() as u64,
            "Rate aggregator started"
        );

        let mut window = WindowAccumulator::new();
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut channel_open = true;

        loop {
            tokio::select! {
                received = self.samples.recv(), if channel_open => match received {
                    Some(sample) => window.record(sample),
                    None => {
                        // Keep ticking so readers see idle (zero) windows.
                        warn!("Sample channel closed, aggregator will only publish idle windows");
                        channel_open = false;
                    }
                },
                _ = ticker.tick() => {
                    let snapshot = window.finish();
                    record_window_gauges(&snapshot);
                    self.store.publish(snapshot).await;

                    debug!(
                        avg_read_ms = snapshot.avg_read_ms,
                        max_read_ms = snapshot.max_read_ms,
                        min_read_ms = snapshot.min_read_ms,
                        rate_per_second = snapshot.rate_per_second,
                        "Published window"
                    );
                }
            }
        }
    }
}

fn record_window_gauges(snapshot: &MetricsSnapshot) {
    metrics::gauge!("nfs_window_avg_read_ms").set(snapshot.avg_read_ms);
    metrics::gauge!("nfs_window_max_read_ms").set(snapshot.max_read_ms);
    metrics::gauge!("nfs_window_min_read_ms").set(snapshot.min_read_ms);
    metrics::gauge!("nfs_window_rate_per_second").set(snapshot.rate_per_second);
}
