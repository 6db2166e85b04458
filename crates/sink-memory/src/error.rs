use beacon_sink::SinkError;
use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Clone, Debug, Error)]
pub enum Error {
    /// The sink was configured to reject deliveries.
    #[error("delivery rejected by memory sink")]
    Rejected,
}

impl SinkError for Error {}
