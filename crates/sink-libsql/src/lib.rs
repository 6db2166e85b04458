//! Sink which writes batches through a long-lived
//! [libsql](https://github.com/tursodatabase/libsql) connection.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::{Error, Result};

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use beacon_sink::{Event, Sink};
use beacon_sink_fn::FnSink;
use libsql::{Builder, Connection, params};
use tracing::debug;

/// SQL for creating the events table
const CREATE_EVENTS_TABLE_SQL: &str = r"
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    properties TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    origin TEXT NOT NULL,
    agent TEXT NOT NULL
)
";

/// SQL for inserting an event
const INSERT_EVENT_SQL: &str = r"
INSERT INTO events (name, properties, timestamp, origin, agent)
VALUES (?, ?, ?, ?, ?)
";

/// A libsql-backed sink.
#[derive(Clone, Debug)]
pub struct LibsqlSink {
    inner: FnSink<Connection, Error>,
}

impl LibsqlSink {
    /// Opens the database at `path`, creates the `events` table if needed and
    /// writes each batch with [`insert_events`].
    ///
    /// # Errors
    ///
    /// This function will return an error if the database cannot be opened or
    /// the table cannot be created.
    pub async fn connect(path: impl AsRef<Path> + Send) -> Result<Self> {
        let connection = open(path).await?;

        connection.execute(CREATE_EVENTS_TABLE_SQL, params![]).await?;

        Ok(Self {
            inner: FnSink::new(connection, insert_events),
        })
    }

    /// Opens the database at `path` and hands every batch to `insert_fn`
    /// together with the shared connection.
    ///
    /// # Errors
    ///
    /// This function will return an error if the database cannot be opened.
    pub async fn connect_with<F, Fut>(path: impl AsRef<Path> + Send, insert_fn: F) -> Result<Self>
    where
        F: Fn(Arc<Connection>, Vec<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let connection = open(path).await?;

        Ok(Self {
            inner: FnSink::new(connection, insert_fn),
        })
    }

    /// The shared connection, e.g. for querying delivered events.
    #[must_use]
    pub fn connection(&self) -> Arc<Connection> {
        Arc::clone(self.inner.client())
    }
}

#[async_trait]
impl Sink for LibsqlSink {
    type Error = Error;

    async fn deliver(&self, events: &[Event]) -> Result<()> {
        self.inner.deliver(events).await
    }
}

async fn open(path: impl AsRef<Path> + Send) -> Result<Connection> {
    let connection = Builder::new_local(path).build().await?.connect()?;

    Ok(connection)
}

/// Inserts every event of the batch into the `events` table in a single
/// transaction.
///
/// # Errors
///
/// This function will return an error if the properties cannot be encoded or
/// any statement fails, in which case nothing from the batch is committed.
pub async fn insert_events(connection: Arc<Connection>, events: Vec<Event>) -> Result<()> {
    let transaction = connection.transaction().await?;

    for event in &events {
        let properties = serde_json::to_string(event.properties())?;

        transaction
            .execute(
                INSERT_EVENT_SQL,
                params![
                    event.name().to_string(),
                    properties,
                    event.timestamp(),
                    event.origin().to_string(),
                    event.agent().to_string(),
                ],
            )
            .await?;
    }

    transaction.commit().await?;

    debug!(events = events.len(), "inserted batch");

    Ok(())
}
