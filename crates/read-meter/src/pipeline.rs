//! Wiring of runner, channel, aggregator and store.

use std::path::PathBuf;

use tokio::task::JoinHandle;

use crate::aggregator::RateAggregator;
use crate::runner::WorkloadRunner;
use crate::sample::{sample_channel, DEFAULT_CHANNEL_CAPACITY};
use crate::store::MetricsStore;

/// Owns every shared piece of the metering pipeline.
///
/// Handed to the HTTP layer in place of process globals. Dropping it
/// cancels any running workload and aborts the aggregator.
pub struct Pipeline {
    runner: WorkloadRunner,
    store: MetricsStore,
    aggregator: JoinHandle<()>,
}

impl Pipeline {
    /// Spawn the aggregator and build an idle runner for `target`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(target: impl Into<PathBuf>) -> Self {
        Self::spawn_with_capacity(target, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn spawn_with_capacity(target: impl Into<PathBuf>, capacity: usize) -> Self {
        let (tx, rx) = sample_channel(capacity);
        let store = MetricsStore::new();
        let aggregator = tokio::spawn(RateAggregator::new(rx, store.clone()).run_forever());

        Self {
            runner: WorkloadRunner::new(target, tx),
            store,
            aggregator,
        }
    }

    pub fn runner(&self) -> &WorkloadRunner {
        &self.runner
    }

    pub fn store(&self) -> MetricsStore {
        self.store.clone()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.aggregator.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkloadError;
    use crate::store::MetricsSnapshot;
    use std::io::Write;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_idle_pipeline_publishes_zeros() {
        let pipeline = Pipeline::spawn("/nonexistent/probe.bin");
        sleep(Duration::from_millis(1200)).await;
        assert_eq!(pipeline.store().current().await, MetricsSnapshot::default());
        assert!(!pipeline.runner().is_running().await);
    }

    #[tokio::test]
    async fn test_running_workload_reaches_store() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 4096]).unwrap();

        let pipeline = Pipeline::spawn(file.path());
        pipeline
            .runner()
            .start(Duration::from_millis(20))
            .await
            .unwrap();

        // Wait for at least one full window with the workload active.
        let mut seen = MetricsSnapshot::default();
        for _ in 0..30 {
            sleep(Duration::from_millis(100)).await;
            seen = pipeline.store().current().await;
            if seen.rate_per_second > 0.0 {
                break;
            }
        }
        pipeline.runner().stop().await;

        assert!(seen.rate_per_second >= 1.0);
        assert!(seen.max_read_ms >= seen.min_read_ms);
        assert!(seen.avg_read_ms <= seen.max_read_ms + 1e-9);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_rejected_starts_keep_single_runner_rate() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 4096]).unwrap();
        let pipeline = Arc::new(Pipeline::spawn(file.path()));

        let attempts: Vec<_> = (0..32)
            .map(|_| {
                let pipeline = pipeline.clone();
                tokio::spawn(async move { pipeline.runner().start(Duration::from_millis(50)).await })
            })
            .collect();

        let mut started = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(()) => started += 1,
                Err(e) => assert_eq!(e, WorkloadError::AlreadyRunning),
            }
        }
        assert_eq!(started, 1);

        // Skip the first, partial window, then sample a few full ones. One
        // runner at 50 ms gives about 20 reads per second; two would give ~40.
        sleep(Duration::from_millis(1500)).await;
        let mut rates = Vec::new();
        for _ in 0..3 {
            rates.push(pipeline.store().current().await.rate_per_second);
            sleep(Duration::from_secs(1)).await;
        }
        pipeline.runner().stop().await;

        for rate in rates {
            assert!(rate >= 1.0 && rate <= 25.0, "rate {} outside single-runner range", rate);
        }
    }
}
