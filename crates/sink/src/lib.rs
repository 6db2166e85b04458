//! Abstract interface for delivering batches of tracked events.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod event;

pub use event::Event;

use std::error::Error;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

/// Marker trait for sink errors.
pub trait SinkError: Debug + Error + Send + Sync + 'static {}

/// A trait representing a batch transport with asynchronous delivery.
///
/// Implementations must report every failure through the returned `Result`
/// so the caller can decide whether to retry the batch.
#[async_trait]
pub trait Sink
where
    Self: Send + Sync + 'static,
{
    /// The error type for the sink.
    type Error: SinkError;

    /// Delivers a batch of events, preserving their order.
    async fn deliver(&self, events: &[Event]) -> Result<(), Self::Error>;
}

#[async_trait]
impl<S> Sink for Arc<S>
where
    S: Sink,
{
    type Error = S::Error;

    async fn deliver(&self, events: &[Event]) -> Result<(), Self::Error> {
        self.as_ref().deliver(events).await
    }
}
