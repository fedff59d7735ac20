//! Error types for review-classify
//!
//! Two layers of errors live here:
//! - [`Error`] - failures of the batch call itself (processor misuse, bad configuration)
//! - [`ClassifyError`] - failures of a single classify call, recorded as data in the batch

use std::time::Duration;
use thiserror::Error;

/// Result type alias for review-classify operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for review-classify
///
/// Only misuse-class problems surface as this type. Per-item failures never do;
/// they are captured as [`crate::types::Outcome::Failure`] entries.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "concurrency")
        key: Option<String>,
    },

    /// Items and outcomes passed together do not line up
    #[error("length mismatch: {items} items but {outcomes} outcomes")]
    LengthMismatch {
        /// Number of input items supplied
        items: usize,
        /// Number of outcomes in the batch supplied
        outcomes: usize,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Failure of one classify call
///
/// Returned by [`crate::classify::Classify`] implementations. The processor turns
/// it into an [`crate::types::ItemError`] at the failing item's index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    /// The remote service reported an error
    #[error("classification service error: {0}")]
    Service(String),

    /// The remote service refused the call because of rate limiting
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The call did not complete within its deadline
    #[error("classification timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The call returned, but the response could not be used
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The call was abandoned because the batch was cancelled
    #[error("cancelled")]
    Cancelled,

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for ClassifyError {
    fn from(e: serde_json::Error) -> Self {
        ClassifyError::InvalidResponse(e.to_string())
    }
}
