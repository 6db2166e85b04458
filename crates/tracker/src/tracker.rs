use crate::config::{RequeuePosition, TrackerConfig};
use crate::environment::{Environment, NoEnvironment};
use crate::stats::{Counters, TrackerStats};
use crate::{Error, Result};

use std::collections::VecDeque;
use std::fmt::{self, Debug};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use beacon_sink::{Event, Sink};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::{CancellationToken, DropGuard};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

/// Batches tracked events and delivers them through a sink.
///
/// Clones share the same queue, timer and sink. The flush timer runs until
/// [`shutdown`](Self::shutdown) is called or the last clone is dropped.
pub struct Tracker<S>
where
    S: Sink,
{
    inner: Arc<Inner<S>>,
    timer_guard: Arc<DropGuard>,
}

struct Inner<S> {
    config: TrackerConfig,
    counters: Counters,
    environment: Box<dyn Environment>,
    /// Cancelled on shutdown or when the last handle is dropped.
    handles_token: CancellationToken,
    queue: Mutex<Queue>,
    runtime: Handle,
    shut_down: AtomicBool,
    shutdown_token: CancellationToken,
    sink: S,
    task_tracker: TaskTracker,
}

/// Queued events tagged with their tracking order, which survives requeues.
struct Queue {
    entries: VecDeque<(u64, Event)>,
    next_sequence: u64,
}

/// A drained queue, split so the events can be handed to the sink as a slice.
struct Batch {
    sequences: Vec<u64>,
    events: Vec<Event>,
}

impl<S> Clone for Tracker<S>
where
    S: Sink,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            timer_guard: Arc::clone(&self.timer_guard),
        }
    }
}

impl<S> Debug for Tracker<S>
where
    S: Sink,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("config", &self.inner.config)
            .field("queue_len", &self.queue_len())
            .field("shut_down", &self.is_shutdown())
            .finish_non_exhaustive()
    }
}

impl<S> Tracker<S>
where
    S: Sink,
{
    /// Creates a new tracker whose events carry no origin or agent.
    ///
    /// # Errors
    ///
    /// See [`Tracker::with_environment`].
    pub fn new(config: TrackerConfig, sink: S) -> Result<Self> {
        Self::with_environment(config, sink, NoEnvironment)
    }

    /// Creates a new tracker which stamps events with metadata from
    /// `environment`, and starts its flush timer.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The config does not validate
    /// - It is called outside of a tokio runtime
    pub fn with_environment(
        config: TrackerConfig,
        sink: S,
        environment: impl Environment,
    ) -> Result<Self> {
        config.validate()?;

        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let shutdown_token = CancellationToken::new();
        let handles_token = shutdown_token.child_token();

        let inner = Arc::new(Inner {
            config,
            counters: Counters::default(),
            environment: Box::new(environment),
            handles_token: handles_token.clone(),
            queue: Mutex::new(Queue {
                entries: VecDeque::with_capacity(config.batch_size),
                next_sequence: 0,
            }),
            runtime,
            shut_down: AtomicBool::new(false),
            shutdown_token,
            sink,
            task_tracker: TaskTracker::new(),
        });

        Inner::spawn_timer(&inner, handles_token.clone());

        Ok(Self {
            inner,
            timer_guard: Arc::new(handles_token.drop_guard()),
        })
    }

    /// Queues an event, flushing if the queue has reached the batch size.
    pub fn track(&self, name: impl Into<String>, properties: impl Into<Value>) {
        let environment = &self.inner.environment;
        let event = Event::new(
            name,
            properties,
            environment.origin().unwrap_or_default(),
            environment.agent().unwrap_or_default(),
        );

        if self.is_shutdown() {
            debug!(event = event.name(), "tracking after shutdown, no timer will flush");
        }

        let reached = self.inner.enqueue(event);
        self.inner.counters.tracked();

        if reached {
            trace!(batch_size = self.inner.config.batch_size, "batch size reached");
            self.inner.flush();
        }
    }

    /// Takes everything queued and delivers it in the background.
    ///
    /// Returns `None`, without calling the sink, if the queue is empty.
    /// Otherwise the returned handle resolves once the delivery (and any
    /// requeue) has completed.
    pub fn flush(&self) -> Option<JoinHandle<()>> {
        self.inner.flush()
    }

    /// Flushes and waits for the delivery to complete.
    pub async fn flush_and_wait(&self) {
        self.inner.flush_and_wait().await;
    }

    /// Flushes once when `signal` resolves, e.g. on a process exit signal.
    ///
    /// The hook is abandoned if the tracker shuts down, or its last handle is
    /// dropped, first.
    pub fn flush_on<F>(&self, signal: F) -> JoinHandle<()>
    where
        F: Future + Send + 'static,
        F::Output: Send,
    {
        let inner = Arc::clone(&self.inner);
        let token = self.inner.handles_token.clone();

        self.inner.task_tracker.spawn_on(
            async move {
                tokio::select! {
                    biased;

                    () = token.cancelled() => {}
                    _ = signal => {
                        info!("exit signal received, flushing");
                        inner.flush_and_wait().await;
                    }
                }
            },
            &self.inner.runtime,
        )
    }

    /// Stops the flush timer and exit hooks, flushes one last time and waits
    /// for every in-flight delivery.
    ///
    /// Events requeued by a failed final delivery stay in the queue.
    pub async fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            self.inner.task_tracker.wait().await;
            return;
        }

        self.inner.shutdown_token.cancel();
        self.inner.flush_and_wait().await;

        self.inner.task_tracker.close();
        self.inner.task_tracker.wait().await;

        let stats = self.stats();
        info!(
            delivered = stats.events_delivered,
            dropped = stats.dropped,
            queued = self.queue_len(),
            "tracker shut down"
        );
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> TrackerStats {
        self.inner.counters.snapshot()
    }

    /// Number of queued events.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.inner.queue.lock().entries.len()
    }

    /// Copy of the queued events, oldest first.
    #[must_use]
    pub fn queued(&self) -> Vec<Event> {
        self.inner
            .queue
            .lock()
            .entries
            .iter()
            .map(|(_, event)| event.clone())
            .collect()
    }

    /// The config the tracker was built with.
    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }
}

impl<S> Inner<S>
where
    S: Sink,
{
    fn spawn_timer(inner: &Arc<Self>, token: CancellationToken) {
        let period = inner.config.flush_interval();
        let start = Instant::now() + period;
        let timer = Arc::clone(inner);

        inner.task_tracker.spawn_on(
            async move {
                let mut ticker = interval_at(start, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

                loop {
                    tokio::select! {
                        biased;

                        () = token.cancelled() => break,
                        _ = ticker.tick() => {
                            timer.flush();
                        }
                    }
                }

                debug!("flush timer stopped");
            },
            &inner.runtime,
        );
    }

    /// Returns whether the queue has reached the batch size.
    fn enqueue(&self, event: Event) -> bool {
        let mut queue = self.queue.lock();
        let sequence = queue.next_sequence;
        queue.next_sequence += 1;
        queue.entries.push_back((sequence, event));
        self.enforce_cap(&mut queue);

        queue.entries.len() >= self.config.batch_size
    }

    fn flush(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let batch = {
            let mut queue = self.queue.lock();
            if queue.entries.is_empty() {
                return None;
            }
            let (sequences, events) = std::mem::take(&mut queue.entries).into_iter().unzip();
            Batch { sequences, events }
        };

        let inner = Arc::clone(self);

        Some(
            self.task_tracker
                .spawn_on(async move { inner.deliver(batch).await }, &self.runtime),
        )
    }

    async fn flush_and_wait(self: &Arc<Self>) {
        if let Some(handle) = self.flush() {
            if let Err(error) = handle.await {
                warn!(%error, "delivery task did not complete");
            }
        }
    }

    async fn deliver(&self, batch: Batch) {
        let events = batch.events.len();

        match self.sink.deliver(&batch.events).await {
            Ok(()) => {
                self.counters.delivered(events);
                debug!(events, "delivered batch");
            }
            Err(error) => {
                self.counters.failed(events);
                warn!(%error, events, "delivery failed, requeueing batch");
                self.requeue(batch);
            }
        }
    }

    fn requeue(&self, batch: Batch) {
        let mut queue = self.queue.lock();
        let entries = batch.sequences.into_iter().zip(batch.events);

        match self.config.requeue {
            RequeuePosition::Head => {
                for entry in entries.rev() {
                    queue.entries.push_front(entry);
                }
            }
            RequeuePosition::Tail => queue.entries.extend(entries),
        }

        self.enforce_cap(&mut queue);
    }

    /// Drops the earliest-tracked events beyond the cap, wherever a requeue
    /// has placed them.
    fn enforce_cap(&self, queue: &mut Queue) {
        let overflow = queue
            .entries
            .len()
            .saturating_sub(self.config.max_queue_len);
        if overflow == 0 {
            return;
        }

        let mut sequences: Vec<u64> = queue.entries.iter().map(|(sequence, _)| *sequence).collect();
        let (_, cutoff, _) = sequences.select_nth_unstable(overflow - 1);
        let cutoff = *cutoff;
        queue.entries.retain(|(sequence, _)| *sequence > cutoff);

        self.counters.dropped(overflow);

        warn!(
            dropped = overflow,
            max_queue_len = self.config.max_queue_len,
            "queue full, dropping oldest events"
        );
    }
}
