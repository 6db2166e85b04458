//! In-memory implementation of the event sink. Records every accepted batch
//! and can be switched into a failing mode. Used for testing.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use beacon_sink::{Event, Sink};
use tokio::sync::{Mutex, Notify};

/// In-memory sink.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    attempts: Arc<AtomicUsize>,
    batches: Arc<Mutex<Vec<Vec<Event>>>>,
    failing: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl MemorySink {
    /// Creates a new `MemorySink` which accepts every delivery.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new `MemorySink` which rejects every delivery until
    /// [`set_failing`](Self::set_failing) is called with `false`.
    #[must_use]
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.set_failing(true);
        sink
    }

    /// Toggles failure injection.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of delivery attempts, successful or not.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// All accepted batches, in delivery order.
    pub async fn batches(&self) -> Vec<Vec<Event>> {
        self.batches.lock().await.clone()
    }

    /// All accepted events, flattened across batches.
    pub async fn events(&self) -> Vec<Event> {
        self.batches.lock().await.iter().flatten().cloned().collect()
    }

    /// Waits until at least `count` delivery attempts have completed.
    pub async fn wait_for_attempts(&self, count: usize) {
        loop {
            let notified = self.notify.notified();
            if self.attempts() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Sink for MemorySink {
    type Error = Error;

    async fn deliver(&self, events: &[Event]) -> Result<(), Self::Error> {
        let result = if self.failing.load(Ordering::SeqCst) {
            Err(Error::Rejected)
        } else {
            self.batches.lock().await.push(events.to_vec());
            Ok(())
        };

        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_waiters();

        result
    }
}
