//! Background workload that repeatedly reads the target file.
//!
//! At most one workload task is live at a time. Starting while one is live
//! is rejected with [`WorkloadError::AlreadyRunning`]; it is never queued.
//! Stopping is fire-and-forget: the cancellation token is tripped and the
//! call returns without waiting for the task to exit. The loop notices the
//! token before its next read and while it sleeps, so a stop takes effect
//! within one interval.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::{WorkloadError, WorkloadResult};
use crate::sample::{Sample, SampleSender};

/// Read interval used when the caller gives none (or an invalid one).
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

/// Point-in-time view of the runner for status endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunnerStatus {
    pub running: bool,
    pub interval_ms: Option<u64>,
    pub target: PathBuf,
}

struct ActiveWorkload {
    interval: Duration,
    cancel: CancellationToken,
    handle: JoinHandle<LoopExit>,
}

/// Why the read loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    Cancelled,
    ChannelClosed,
}

impl ActiveWorkload {
    fn is_live(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Start/stop control over the single read workload.
pub struct WorkloadRunner {
    target: PathBuf,
    samples: SampleSender,
    /// Held across the check-and-spawn in `start`, which is what keeps two
    /// concurrent callers from both starting a workload.
    active: Mutex<Option<ActiveWorkload>>,
}

impl WorkloadRunner {
    pub fn new(target: impl Into<PathBuf>, samples: SampleSender) -> Self {
        Self {
            target: target.into(),
            samples,
            active: Mutex::new(None),
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Spawn the read loop with the given interval between reads.
    pub async fn start(&self, interval: Duration) -> WorkloadResult<()> {
        let mut active = self.active.lock().await;

        if let Some(current) = active.as_ref() {
            if current.is_live() {
                warn!(
                    interval_ms = current.interval.as_millis() as u64,
                    "Rejected start, workload already running"
                );
                return Err(WorkloadError::AlreadyRunning);
            }
            debug!("Previous workload exited on its own, starting a new one");
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(read_loop(
            self.target.clone(),
            interval,
            self.samples.clone(),
            cancel.clone(),
        ));

        *active = Some(ActiveWorkload {
            interval,
            cancel,
            handle,
        });
        metrics::gauge!("nfs_workload_running").set(1.0);

        info!(
            path = %self.target.display(),
            interval_ms = interval.as_millis() as u64,
            "Workload started"
        );
        Ok(())
    }

    /// Signal the workload to stop. No-op when nothing is running.
    pub async fn stop(&self) {
        let Some(workload) = self.active.lock().await.take() else {
            debug!("Stop requested with no workload running");
            return;
        };

        workload.cancel.cancel();
        metrics::gauge!("nfs_workload_running").set(0.0);
        info!("Workload stop signalled");
    }

    pub async fn is_running(&self) -> bool {
        self.active
            .lock()
            .await
            .as_ref()
            .is_some_and(ActiveWorkload::is_live)
    }

    pub async fn status(&self) -> RunnerStatus {
        let active = self.active.lock().await;
        let live = active.as_ref().filter(|w| w.is_live());

        RunnerStatus {
            running: live.is_some(),
            interval_ms: live.map(|w| w.interval.as_millis() as u64),
            target: self.target.clone(),
        }
    }
}

impl Drop for WorkloadRunner {
    fn drop(&mut self) {
        if let Some(workload) = self.active.get_mut().take() {
            workload.cancel.cancel();
        }
    }
}

/// One read, one sample, one sleep, until cancelled.
///
/// A failed read is logged and still produces a sample carrying the time
/// the failed attempt took.
async fn read_loop(
    target: PathBuf,
    interval: Duration,
    samples: SampleSender,
    cancel: CancellationToken,
) -> LoopExit {
    let exit = loop {
        if cancel.is_cancelled() {
            break LoopExit::Cancelled;
        }

        let started = Instant::now();
        let result = tokio::fs::read(&target).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        metrics::counter!("nfs_reads_total").increment(1);
        metrics::histogram!("nfs_read_duration_ms").record(latency_ms);

        match result {
            Ok(contents) => trace!(bytes = contents.len(), latency_ms, "Read target"),
            Err(e) => {
                metrics::counter!("nfs_read_errors_total").increment(1);
                warn!(
                    path = %target.display(),
                    error = %e,
                    latency_ms,
                    "Read failed"
                );
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break LoopExit::Cancelled,
            sent = samples.send(Sample::read(latency_ms)) => {
                if sent.is_err() {
                    warn!("Sample channel closed, stopping workload");
                    break LoopExit::ChannelClosed;
                }
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break LoopExit::Cancelled,
            _ = tokio::time::sleep(interval) => {}
        }
    };

    // `stop()` already cleared the gauge for a cancelled loop, and a newer
    // workload may own it by now.
    if exit == LoopExit::ChannelClosed {
        metrics::gauge!("nfs_workload_running").set(0.0);
    }

    debug!(path = %target.display(), ?exit, "Workload loop exited");
    exit
}
