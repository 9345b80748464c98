use vchain_codec::CodecError;
use vchain_intake::QueueError;
use vchain_ledger::{AnchorError, LedgerError};
use vchain_store::{ResolveError, StoreError};
use vchain_types::{AccountId, ContentAddress};

/// Errors surfaced by chain assembly and block building.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("anchor error: {0}")]
    Anchor(#[from] AnchorError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("content store error: {0}")]
    Store(#[from] StoreError),

    #[error("operation queue error: {0}")]
    Queue(#[from] QueueError),

    /// Adjacent blocks of the assembled chain are not hash-linked.
    #[error("chain discontinuity at block {sequence} ({address}): {detail}")]
    ChainDiscontinuity {
        sequence: u64,
        address: ContentAddress,
        detail: String,
    },

    /// Another builder advanced the chain between reading the head and
    /// anchoring.
    #[error("chain head moved: built on {expected:?}, head is now {found:?}")]
    HeadMoved {
        expected: Option<ContentAddress>,
        found: Option<ContentAddress>,
    },

    #[error("credential signs for {actual}, chain account is {expected}")]
    CredentialMismatch {
        expected: AccountId,
        actual: AccountId,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Returns `true` if running the whole operation again may succeed.
    ///
    /// Publishing is idempotent by address, so a failed build can always be
    /// repeated from scratch when this holds.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Anchor(AnchorError::Ledger(e)) | Self::Ledger(e) => {
                e.is_retryable() || matches!(e, LedgerError::BadSequence { .. })
            }
            Self::Resolve(e) => e.is_retryable(),
            Self::Store(e) => matches!(e, StoreError::Unavailable(_)),
            Self::Queue(e) => e.is_retryable(),
            Self::HeadMoved { .. } => true,
            Self::Codec(_)
            | Self::Anchor(AnchorError::CorruptAnchorMetadata { .. })
            | Self::ChainDiscontinuity { .. }
            | Self::CredentialMismatch { .. }
            | Self::Config(_) => false,
        }
    }
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
