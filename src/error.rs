//! Error types for the stream engine.

use thiserror::Error;

/// Main error type for stream operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("Handler already unsubscribed")]
    AlreadyUnsubscribed,

    #[error("Invalid event source: {0}")]
    InvalidSource(String),

    #[error("Memo object already disposed")]
    MemoDisposed,

    #[error("Scheduler has been shut down")]
    SchedulerStopped,

    #[error("Invalid scheduler configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for StreamError {
    fn from(e: serde_json::Error) -> Self {
        StreamError::InvalidConfig(e.to_string())
    }
}

/// Result type for stream operations.
pub type Result<T> = std::result::Result<T, StreamError>;
