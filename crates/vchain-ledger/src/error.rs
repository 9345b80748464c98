use vchain_types::{AccountId, AnchorId};

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    /// The envelope's sequence is not the account's next sequence number.
    #[error("bad sequence for {account}: expected {expected}, got {actual}")]
    BadSequence {
        account: AccountId,
        expected: u64,
        actual: u64,
    },

    #[error("signature does not verify against the source account")]
    BadSignature,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid paging cursor: {0}")]
    InvalidCursor(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// The ledger could not be reached or answered with a transient failure.
    #[error("ledger transport error: {0}")]
    Transport(String),
}

impl LedgerError {
    /// Returns `true` if repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors from reading chain anchors off the ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnchorError {
    /// A transaction carries the anchor naming convention but its payload
    /// cannot be turned into a content address.
    #[error("corrupt anchor metadata in transaction {anchor_id}: {reason}")]
    CorruptAnchorMetadata { anchor_id: AnchorId, reason: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
