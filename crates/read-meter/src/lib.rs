//! Read-latency metering pipeline.
//!
//! A [`WorkloadRunner`] repeatedly reads a target file and emits one
//! [`Sample`] per read onto a bounded channel. A single [`RateAggregator`]
//! drains that channel, folds samples into a one-second window and
//! publishes a [`MetricsSnapshot`] to the shared [`MetricsStore`] at every
//! window boundary.
//!
//! ```text
//! WorkloadRunner -> sample channel -> RateAggregator -> MetricsStore -> readers
//! ```

pub mod aggregator;
pub mod error;
pub mod pipeline;
pub mod runner;
pub mod sample;
pub mod store;
pub mod window;

pub use aggregator::{RateAggregator, WINDOW_PERIOD};
pub use error::{WorkloadError, WorkloadResult};
pub use pipeline::Pipeline;
pub use runner::{RunnerStatus, WorkloadRunner, DEFAULT_INTERVAL};
pub use sample::{sample_channel, Sample, SampleReceiver, SampleSender, DEFAULT_CHANNEL_CAPACITY};
pub use store::{MetricsSnapshot, MetricsStore};
pub use window::WindowAccumulator;
