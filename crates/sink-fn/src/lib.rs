//! Sink which forwards each batch, together with a long-lived client handle,
//! to a caller-supplied function.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::fmt::{self, Debug};
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use beacon_sink::{Event, Sink, SinkError};
use futures::FutureExt;
use futures::future::BoxFuture;

type DeliverFn<C, E> =
    Arc<dyn Fn(Arc<C>, Vec<Event>) -> BoxFuture<'static, Result<(), E>> + Send + Sync>;

/// A sink that hands each batch to a caller-supplied function.
///
/// The client handle is created once, when the sink is created, and shared
/// with every call. Whatever the function returns is reported to the caller
/// as-is.
pub struct FnSink<C, E = Error> {
    client: Arc<C>,
    deliver_fn: DeliverFn<C, E>,
}

impl<C, E> Clone for FnSink<C, E> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            deliver_fn: Arc::clone(&self.deliver_fn),
        }
    }
}

impl<C, E> Debug for FnSink<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSink")
            .field("client", &std::any::type_name::<C>())
            .finish_non_exhaustive()
    }
}

impl<C, E> FnSink<C, E>
where
    C: Send + Sync + 'static,
    E: SinkError,
{
    /// Creates a new sink around an existing client handle.
    pub fn new<F, Fut>(client: C, deliver_fn: F) -> Self
    where
        F: Fn(Arc<C>, Vec<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        Self {
            client: Arc::new(client),
            deliver_fn: Arc::new(move |client, events| deliver_fn(client, events).boxed()),
        }
    }

    /// Builds the client handle from connection parameters, then creates the
    /// sink around it.
    ///
    /// # Errors
    ///
    /// Returns whatever error the connector returns.
    pub async fn connect<P, CF, CFut, F, Fut>(
        params: P,
        connector: CF,
        deliver_fn: F,
    ) -> Result<Self, E>
    where
        CF: FnOnce(P) -> CFut + Send,
        CFut: Future<Output = Result<C, E>> + Send,
        F: Fn(Arc<C>, Vec<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        let client = connector(params).await?;

        Ok(Self::new(client, deliver_fn))
    }

    /// The shared client handle.
    #[must_use]
    pub const fn client(&self) -> &Arc<C> {
        &self.client
    }
}

#[async_trait]
impl<C, E> Sink for FnSink<C, E>
where
    C: Send + Sync + 'static,
    E: SinkError,
{
    type Error = E;

    async fn deliver(&self, events: &[Event]) -> Result<(), Self::Error> {
        (self.deliver_fn)(Arc::clone(&self.client), events.to_vec()).await
    }
}
