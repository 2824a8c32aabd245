//! Error types for ferry

use thiserror::Error;

/// Result type alias for ferry core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for ferry core operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure while reading from the source tracker
    #[error("Source tracker error: {0}")]
    Source(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
