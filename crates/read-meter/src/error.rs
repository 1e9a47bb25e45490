//! Error types for the read-meter crate.

use thiserror::Error;

/// Errors returned by workload control operations.
///
/// Read failures inside the workload loop are not represented here: they
/// are logged and counted, and the loop keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkloadError {
    #[error("Workload already running")]
    AlreadyRunning,
}

/// Result type for workload control operations.
pub type WorkloadResult<T> = std::result::Result<T, WorkloadError>;
