//! Per-window accumulation of read latencies.

use crate::sample::Sample;
use crate::store::MetricsSnapshot;

/// Running totals for the current one-second window.
///
/// Owned exclusively by the aggregator. Reset to all-zero at every window
/// boundary; nothing carries over between windows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowAccumulator {
    pub sum_latency: f64,
    pub count: f64,
    pub max_latency: f64,
    pub min_latency: f64,
}

impl WindowAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one sample into the window.
    pub fn record(&mut self, sample: Sample) {
        let latency = sample.latency_ms;

        // The first sample of a window sets both bounds, even at 0 ms.
        if self.is_empty() {
            self.max_latency = latency;
            self.min_latency = latency;
        } else {
            self.max_latency = self.max_latency.max(latency);
            self.min_latency = self.min_latency.min(latency);
        }

        self.sum_latency += latency;
        self.count += sample.count;
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0.0
    }

    /// Mean latency, or 0 when the window saw no latency at all.
    pub fn average(&self) -> f64 {
        if self.sum_latency > 0.0 {
            self.sum_latency / self.count
        } else {
            0.0
        }
    }

    /// Snapshot of the window as it stands.
    pub fn summarize(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            avg_read_ms: self.average(),
            max_read_ms: self.max_latency,
            min_read_ms: self.min_latency,
            rate_per_second: self.count,
        }
    }

    /// Close the window: return its snapshot and reset for the next one.
    pub fn finish(&mut self) -> MetricsSnapshot {
        let snapshot = self.summarize();
        *self = Self::default();
        snapshot
    }
}
