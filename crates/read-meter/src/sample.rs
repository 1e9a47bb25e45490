//! Latency samples and the bounded channel that carries them.

use tokio::sync::mpsc;

/// Capacity of the sample channel when none is given.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// One observation of a read operation's duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Wall-clock duration of the read, in milliseconds.
    pub latency_ms: f64,
    /// Number of operations this sample accounts for. Always 1 for reads.
    pub count: f64,
}

impl Sample {
    /// A sample for a single read that took `latency_ms`.
    pub fn read(latency_ms: f64) -> Self {
        Self {
            latency_ms,
            count: 1.0,
        }
    }
}

pub type SampleSender = mpsc::Sender<Sample>;
pub type SampleReceiver = mpsc::Receiver<Sample>;

/// Create the FIFO channel between the workload and the aggregator.
///
/// Sends wait for free capacity instead of dropping, so a slow consumer
/// throttles the workload rather than silently losing samples.
pub fn sample_channel(capacity: usize) -> (SampleSender, SampleReceiver) {
    mpsc::channel(capacity.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_sample_counts_one() {
        let s = Sample::read(12.5);
        assert_eq!(s.latency_ms, 12.5);
        assert_eq!(s.count, 1.0);
    }

    #[tokio::test]
    async fn test_channel_is_fifo() {
        let (tx, mut rx) = sample_channel(4);
        for l in [3.0, 1.0, 2.0] {
            tx.send(Sample::read(l)).await.unwrap();
        }
        assert_eq!(rx.recv().await.unwrap().latency_ms, 3.0);
        assert_eq!(rx.recv().await.unwrap().latency_ms, 1.0);
        assert_eq!(rx.recv().await.unwrap().latency_ms, 2.0);
    }

    #[tokio::test]
    async fn test_full_channel_blocks_sender() {
        let (tx, mut rx) = sample_channel(1);
        tx.send(Sample::read(1.0)).await.unwrap();
        assert!(tx.try_send(Sample::read(2.0)).is_err());

        rx.recv().await.unwrap();
        assert!(tx.try_send(Sample::read(2.0)).is_ok());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let (tx, _rx) = sample_channel(0);
        assert_eq!(tx.max_capacity(), 1);
    }
}
