use uuid::Uuid;

/// Errors from the pending-operations queue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// The queue could not be reached or failed transiently.
    #[error("operation queue unavailable: {0}")]
    Unavailable(String),

    #[error("queue record not found: {0}")]
    UnknownRecord(Uuid),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl QueueError {
    /// Returns `true` if repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Result alias for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;
