use thiserror::Error;

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a tracker.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration is unusable.
    #[error("invalid tracker config: {0}")]
    InvalidConfig(String),

    /// Trackers must be created from within a tokio runtime.
    #[error("no tokio runtime available")]
    NoRuntime,

    /// The configuration could not be parsed.
    #[error(transparent)]
    Parse(#[from] toml::de::Error),
}
