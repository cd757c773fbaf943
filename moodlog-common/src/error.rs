//! Common error types for moodlog

use thiserror::Error;

/// Common result type for moodlog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across moodlog crates
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected user input (e.g. empty entry text). Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No active principal, or the principal may not touch the resource. Never retried.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Transport-level failure reaching a remote service
    #[error("Network error: {0}")]
    Network(String),

    /// Remote call exceeded its deadline
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Remote service answered with a transient failure (5xx, 429)
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Non-retryable provider failure (bad credentials, bad config, malformed response)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid argument passed to an internal operation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a retry of the failed remote call may succeed.
    ///
    /// Network, timeout and server (5xx/429) failures are transient; everything
    /// else is final and returned to the caller on the first attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Timeout(_) | Error::Server { .. }
        )
    }
}
