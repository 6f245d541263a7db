//! Error types for the console

use tees_admin_client::ErrorKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] tees_admin_client::Error),

    #[error("Invalid configuration draft: {}", .0.join("; "))]
    InvalidDraft(Vec<String>),

    #[error("Nothing loaded yet: {0}")]
    NotLoaded(&'static str),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Api(e) => e.kind(),
            Error::InvalidDraft(_) | Error::InvalidInput(_) => ErrorKind::Validation,
            Error::NotLoaded(_) | Error::Config(_) | Error::Other(_) => ErrorKind::Local,
        }
    }

    /// A 401 was seen; the operator has to provide a new token.
    pub fn is_session_expired(&self) -> bool {
        matches!(
            self,
            Error::Api(tees_admin_client::Error::Unauthorized)
                | Error::Api(tees_admin_client::Error::NoSession(_))
        )
    }
}
