use beacon_sink::SinkError;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// General-purpose error for caller-supplied delivery functions.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct Error(BoxError);

impl Error {
    /// Wraps any error or message.
    pub fn new(error: impl Into<BoxError>) -> Self {
        Self(error.into())
    }

    /// Returns the wrapped error.
    #[must_use]
    pub fn into_inner(self) -> BoxError {
        self.0
    }
}

impl SinkError for Error {}
