use beacon_sink::SinkError;
use reqwest::StatusCode;
use thiserror::Error;

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The endpoint could not be parsed as a URL.
    #[error("invalid endpoint `{endpoint}`: {source}")]
    InvalidEndpoint {
        /// The rejected endpoint.
        endpoint: String,

        /// The parse failure.
        source: url::ParseError,
    },

    /// No endpoint was configured.
    #[error("no endpoint configured")]
    MissingEndpoint,

    /// The request could not be sent or the response could not be read.
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    /// The collector answered with a non-success status.
    #[error("collector responded with {0}")]
    Status(StatusCode),

    /// The endpoint does not use HTTP or HTTPS.
    #[error("unsupported endpoint scheme: {0}")]
    UnsupportedScheme(String),
}

impl SinkError for Error {}
