//! Error types for Linear operations

use thiserror::Error;

/// Result type for Linear operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to Linear or migrating into it
#[derive(Error, Debug)]
pub enum Error {
    /// Team lookup returned no match
    #[error("Team {0} not found in Linear.")]
    TeamNotFound(String),

    /// GraphQL error array that is not a rate-limit signal
    #[error("GraphQL Error: {0}")]
    GraphQL(String),

    /// Still rate limited after the retry ceiling
    #[error("Rate limit reached after {retries} retries")]
    RateLimitExceeded { retries: u32 },

    /// Transport failure or a body that is not JSON
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// A mutation ran but the expected object is absent
    #[error("Missing data in Linear response: {0}")]
    MissingData(String),

    /// Failure while reading the source item
    #[error(transparent)]
    Core(#[from] ferry_core::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err.to_string())
    }
}
