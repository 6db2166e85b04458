use beacon_sink::SinkError;
use thiserror::Error;

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller-supplied insert function failed.
    #[error("{0}")]
    Custom(String),

    /// Properties could not be encoded for storage.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The database rejected an operation.
    #[error(transparent)]
    Libsql(#[from] libsql::Error),
}

impl SinkError for Error {}
