//! Collects events into an in-memory queue and hands them to a [`Sink`] in
//! ordered batches.
//!
//! A batch is flushed when the queue reaches the configured batch size, when
//! the periodic flush timer fires, when an exit hook installed with
//! [`Tracker::flush_on`] resolves, or on an explicit [`Tracker::flush`].
//! Batches the sink rejects are put back into the queue for the next flush.
//!
//! [`Sink`]: beacon_sink::Sink
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod config;
mod environment;
mod error;
mod stats;
mod tracker;

pub use config::{RequeuePosition, TrackerConfig};
pub use environment::{Environment, NoEnvironment, ProcessEnvironment, StaticEnvironment};
pub use error::{Error, Result};
pub use stats::TrackerStats;
pub use tracker::Tracker;
