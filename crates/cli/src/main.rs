//! CLI binary which reads JSON-lines events from stdin and batches them to a
//! collector endpoint or a libsql database.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

use std::fs;
use std::path::PathBuf;

use beacon_sink::Sink;
use beacon_sink_http::HttpSink;
use beacon_sink_libsql::LibsqlSink;
use beacon_tracker::{ProcessEnvironment, Tracker, TrackerConfig, TrackerStats};
use clap::{ArgGroup, Parser};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// CLI-specific error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP sink error
    #[error(transparent)]
    Http(#[from] beacon_sink_http::Error),

    /// Reading input or the config file failed
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Stats could not be encoded
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// libsql sink error
    #[error(transparent)]
    Libsql(#[from] beacon_sink_libsql::Error),

    /// Neither an endpoint nor a database was given
    #[error("either --endpoint or --database is required")]
    NoSink,

    /// Tracker construction or config error
    #[error(transparent)]
    Tracker(#[from] beacon_tracker::Error),
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("sink").required(true).args(["endpoint", "database"])))]
struct Args {
    /// Collector endpoint batches are POSTed to
    #[arg(long, env = "BEACON_ENDPOINT")]
    endpoint: Option<String>,

    /// libsql database file batches are written to
    #[arg(long, env = "BEACON_DATABASE")]
    database: Option<PathBuf>,

    /// Queue length which triggers a flush [default: 10]
    #[arg(long, env = "BEACON_BATCH_SIZE")]
    batch_size: Option<usize>,

    /// Flush timer period in milliseconds [default: 5000]
    #[arg(long, env = "BEACON_FLUSH_INTERVAL_MS")]
    flush_interval_ms: Option<u64>,

    /// Queue length beyond which the oldest events are dropped [default: 10000]
    #[arg(long, env = "BEACON_MAX_QUEUE_LEN")]
    max_queue_len: Option<usize>,

    /// TOML file with tracker settings, overridden by the flags above
    #[arg(long, env = "BEACON_CONFIG")]
    config: Option<PathBuf>,
}

impl Args {
    fn tracker_config(&self) -> Result<TrackerConfig, Error> {
        let mut config = match &self.config {
            Some(path) => TrackerConfig::from_toml_str(&fs::read_to_string(path)?)?,
            None => TrackerConfig::default(),
        };

        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }

        if let Some(flush_interval_ms) = self.flush_interval_ms {
            config.flush_interval_ms = flush_interval_ms;
        }

        if let Some(max_queue_len) = self.max_queue_len {
            config.max_queue_len = max_queue_len;
        }

        config.validate()?;

        Ok(config)
    }
}

/// One line of input.
#[derive(Debug, Deserialize)]
struct InputEvent {
    event: String,

    #[serde(default = "empty_properties")]
    properties: Value,
}

fn empty_properties() -> Value {
    Value::Object(Map::new())
}

/// Blank lines yield `None`.
fn parse_line(line: &str) -> Result<Option<InputEvent>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    serde_json::from_str(line).map(Some)
}

/// Tracks every valid input line until EOF or cancellation and returns how
/// many events were tracked.
async fn forward<S, R>(
    tracker: &Tracker<S>,
    input: R,
    shutdown_token: &CancellationToken,
) -> Result<usize, Error>
where
    S: Sink,
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut tracked = 0;
    let mut line_number = 0;

    loop {
        let line = tokio::select! {
            biased;

            () = shutdown_token.cancelled() => break,
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            break;
        };
        line_number += 1;

        match parse_line(&line) {
            Ok(Some(InputEvent { event, properties })) => {
                tracker.track(event, properties);
                tracked += 1;
            }
            Ok(None) => {}
            Err(error) => warn!(%error, line = line_number, "skipping invalid input line"),
        }
    }

    Ok(tracked)
}

async fn collect<S>(
    config: TrackerConfig,
    sink: S,
    shutdown_token: CancellationToken,
) -> Result<TrackerStats, Error>
where
    S: Sink,
{
    let tracker = Tracker::with_environment(
        config,
        sink,
        ProcessEnvironment::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
    )?;

    tracker.flush_on(shutdown_token.clone().cancelled_owned());

    let stdin = BufReader::new(tokio::io::stdin());
    let forwarded = forward(&tracker, stdin, &shutdown_token).await;

    tracker.shutdown().await;

    let tracked = forwarded?;
    info!(tracked, "input finished");

    Ok(tracker.stats())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                    _ = sigint.recv() => info!("Received SIGINT"),
                }
                return;
            }
            (Err(error), _) | (_, Err(error)) => {
                warn!(%error, "failed to install signal handlers, falling back to ctrl-c");
            }
        }
    }

    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Received interrupt signal");
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.tracker_config()?;

    let shutdown_token = CancellationToken::new();

    let signal_shutdown_token = shutdown_token.clone();
    tokio::spawn(async move {
        wait_for_signal().await;

        info!("Shutting down");
        signal_shutdown_token.cancel();
    });

    let stats = if let Some(endpoint) = &args.endpoint {
        info!(%endpoint, "delivering to collector");
        collect(config, HttpSink::new(endpoint)?, shutdown_token).await?
    } else if let Some(database) = &args.database {
        info!(database = %database.display(), "delivering to libsql");
        collect(config, LibsqlSink::connect(database).await?, shutdown_token).await?
    } else {
        return Err(Error::NoSink);
    };

    println!("{}", serde_json::to_string(&stats)?);

    Ok(())
}
