//! Error types for the pairwise judge.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, JudgeError>;

/// Failure signals coming back from the inference service.
///
/// Each branch carries its own recovery policy in the evaluator:
/// rate limits rotate credentials and retry, malformed requests are
/// recorded as `"unknown error"`, everything else aborts the batch.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The current credential exceeded its allowed request rate.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The service rejected the request itself (invalid parameters, content policy).
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Any other service or transport failure.
    #[error("Service failure: {0}")]
    Failed(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Failed(err.to_string())
    }
}

/// Errors that can occur in the pairwise judge.
#[derive(Error, Debug)]
pub enum JudgeError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration file error or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An evaluator needs at least one credential.
    #[error("Credential pool is empty")]
    EmptyCredentialPool,

    /// Every retry for a single pair was rate limited.
    #[error("Tried {attempts} times, exceeding the retry limit of {limit}")]
    RetryLimitExceeded { attempts: usize, limit: usize },

    /// Unclassified failure from the inference service.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl JudgeError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for JudgeError {
    fn from(err: serde_json::Error) -> Self {
        JudgeError::Serialization(err.to_string())
    }
}
