//! Shared holder for the most recently completed window.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Summary of one completed window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(rename = "avg-read-ms")]
    pub avg_read_ms: f64,
    #[serde(rename = "max-read-ms")]
    pub max_read_ms: f64,
    #[serde(rename = "min-read-ms")]
    pub min_read_ms: f64,
    #[serde(rename = "rate-second")]
    pub rate_per_second: f64,
}

/// Lock-guarded current snapshot.
///
/// Cloning yields another handle to the same snapshot. Writers replace all
/// four fields under one lock acquisition and readers copy it out under the
/// same lock, so no reader ever sees fields from two different windows.
#[derive(Debug, Clone, Default)]
pub struct MetricsStore {
    current: Arc<Mutex<MetricsSnapshot>>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the snapshot as a unit.
    pub async fn update(&self, avg: f64, max: f64, min: f64, rate: f64) {
        self.publish(MetricsSnapshot {
            avg_read_ms: avg,
            max_read_ms: max,
            min_read_ms: min,
            rate_per_second: rate,
        })
        .await;
    }

    pub async fn publish(&self, snapshot: MetricsSnapshot) {
        *self.current.lock().await = snapshot;
    }

    /// Copy of the current snapshot.
    pub async fn current(&self) -> MetricsSnapshot {
        *self.current.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_starts_zeroed() {
        let store = MetricsStore::new();
        assert_eq!(store.current().await, MetricsSnapshot::default());
    }

    #[tokio::test]
    async fn test_update_replaces_all_fields() {
        let store = MetricsStore::new();
        store.update(1.0, 2.0, 0.5, 4.0).await;
        store.update(20.0, 30.0, 10.0, 3.0).await;

        let snap = store.current().await;
        assert_eq!(snap.avg_read_ms, 20.0);
        assert_eq!(snap.max_read_ms, 30.0);
        assert_eq!(snap.min_read_ms, 10.0);
        assert_eq!(snap.rate_per_second, 3.0);
    }

    #[tokio::test]
    async fn test_clones_share_snapshot() {
        let store = MetricsStore::new();
        let reader = store.clone();
        store.update(1.0, 1.0, 1.0, 1.0).await;
        assert_eq!(reader.current().await.rate_per_second, 1.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reads_never_torn() {
        let store = MetricsStore::new();

        // Every write keeps all four fields equal to `i`, so a torn read
        // would show differing fields.
        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 1..=2000 {
                    let v = i as f64;
                    store.update(v, v, v, v).await;
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..4 {
            let store = store.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..2000 {
                    let s = store.current().await;
                    assert_eq!(s.avg_read_ms, s.max_read_ms);
                    assert_eq!(s.max_read_ms, s.min_read_ms);
                    assert_eq!(s.min_read_ms, s.rate_per_second);
                }
            }));
        }

        writer.await.unwrap();
        for r in readers {
            r.await.unwrap();
        }
        assert_eq!(store.current().await.rate_per_second, 2000.0);
    }

    #[test]
    fn test_wire_field_names() {
        let snap = MetricsSnapshot {
            avg_read_ms: 20.0,
            max_read_ms: 30.0,
            min_read_ms: 10.0,
            rate_per_second: 3.0,
        };
        let json = serde_json::to_value(snap).unwrap();
        assert_eq!(json["avg-read-ms"], 20.0);
        assert_eq!(json["max-read-ms"], 30.0);
        assert_eq!(json["min-read-ms"], 10.0);
        assert_eq!(json["rate-second"], 3.0);
        assert_eq!(json.as_object().unwrap().len(), 4);
    }
}
