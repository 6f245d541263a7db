//! Error types for the admin client

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Admin client errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Session expired or not authorized")]
    Unauthorized,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No session: {0}")]
    NoSession(String),
}

/// Coarse grouping used by callers to decide how to report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network or transport failure. Retry is possible.
    Transport,
    /// The server rejected the payload (HTTP 400/422) or a local check failed.
    Validation,
    /// HTTP 401. The session has been expired.
    Unauthorized,
    /// HTTP 404, typically a feature that is switched off (e.g. `/metrics`).
    Disabled,
    /// Any other non-success status.
    Server,
    /// Local failures: JSON, IO, configuration.
    Local,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(_) => ErrorKind::Transport,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Unauthorized | Error::NoSession(_) => ErrorKind::Unauthorized,
            Error::NotFound(_) => ErrorKind::Disabled,
            Error::Status { .. } => ErrorKind::Server,
            Error::Json(_) | Error::Url(_) | Error::Io(_) => ErrorKind::Local,
        }
    }

    /// Whether a manual retry could reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(Error::Unauthorized.kind(), ErrorKind::Unauthorized);
        assert_eq!(
            Error::Validation("globalMax".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(Error::NotFound("/metrics".into()).kind(), ErrorKind::Disabled);
        assert_eq!(
            Error::Status {
                status: 503,
                message: "down".into()
            }
            .kind(),
            ErrorKind::Server
        );
    }

    #[test]
    fn test_retryable() {
        assert!(Error::Status {
            status: 502,
            message: String::new()
        }
        .is_retryable());
        assert!(!Error::Status {
            status: 409,
            message: String::new()
        }
        .is_retryable());
        assert!(!Error::Unauthorized.is_retryable());
    }
}
