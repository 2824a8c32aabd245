//! Error types for GitLab operations

use ferry_core::text::truncate_chars;
use thiserror::Error;

const BODY_EXCERPT_CHARS: usize = 200;

/// Result type for GitLab operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during GitLab operations
#[derive(Error, Debug)]
pub enum Error {
    /// Transport failure
    #[error("GitLab request failed: {0}")]
    Http(String),

    /// Non-success HTTP status
    #[error("GitLab API returned {status} for {url}: {body}")]
    Status { status: u16, url: String, body: String },

    /// Token missing, invalid, or lacking the required scope
    #[error("GitLab rejected the token for {0}")]
    Auth(String),

    /// The requested resource does not exist or is hidden from the token
    #[error("GitLab resource not found: {0}")]
    NotFound(String),

    /// Invalid request URL
    #[error("Invalid GitLab URL: {0}")]
    Url(String),

    /// Unexpected response shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// A field the request needs is absent from the item
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Linear side failure
    #[error(transparent)]
    Linear(#[from] ferry_linear::Error),

    /// Core error
    #[error(transparent)]
    Core(#[from] ferry_core::Error),
}

impl Error {
    /// Classify a non-success response
    ///
    /// `body` is cut to a short excerpt before it is kept.
    pub fn from_status(status: u16, url: &str, body: &str) -> Self {
        match status {
            401 | 403 => Error::Auth(url.to_string()),
            404 => Error::NotFound(url.to_string()),
            _ => Error::Status {
                status,
                url: url.to_string(),
                body: truncate_chars(body, BODY_EXCERPT_CHARS).to_string(),
            },
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::Url(err.to_string())
    }
}

impl From<Error> for ferry_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Core(inner) => inner,
            other => ferry_core::Error::Source(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let url = "https://gitlab.example.com/api/v4/projects/1";

        assert!(matches!(Error::from_status(401, url, ""), Error::Auth(_)));
        assert!(matches!(Error::from_status(403, url, ""), Error::Auth(_)));
        assert!(matches!(Error::from_status(404, url, ""), Error::NotFound(u) if u == url));

        let body = "x".repeat(500);
        match Error::from_status(500, url, &body) {
            Error::Status { status, body, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), BODY_EXCERPT_CHARS);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_status_message_includes_body() {
        let err = Error::from_status(502, "https://gitlab.example.com/api/v4", "Bad Gateway");
        assert_eq!(
            err.to_string(),
            "GitLab API returned 502 for https://gitlab.example.com/api/v4: Bad Gateway"
        );
    }

    #[test]
    fn test_converts_to_source_error() {
        let err: ferry_core::Error = Error::NotFound("https://gitlab.example.com".to_string()).into();
        assert!(matches!(err, ferry_core::Error::Source(_)));
    }
}
