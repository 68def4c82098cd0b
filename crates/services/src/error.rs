//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;

/// Errors emitted by the learning session controller.
///
/// None of these are fatal to a session: they report input that the current
/// state does not accept.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session already finished")]
    Finished,
    #[error("going back is not available in this mode")]
    BackNotAllowed,
    #[error("current step has no answer choices")]
    NoQuestion,
}

/// Errors emitted while delivering a progress report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressSinkError {
    #[error("progress endpoint is not configured")]
    Disabled,
    #[error("progress endpoint answered with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("progress report could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
