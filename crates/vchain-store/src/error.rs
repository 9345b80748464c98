use vchain_codec::CodecError;
use vchain_types::ContentAddress;

/// Errors from content store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or failed transiently.
    #[error("content store unavailable: {0}")]
    Unavailable(String),

    /// Storage backend is read-only.
    #[error("store is read-only")]
    ReadOnly,

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from resolving a content address into a block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The store could not produce bytes for the address. Retryable.
    #[error("content unavailable for {address}: {reason}")]
    ContentUnavailable {
        address: ContentAddress,
        reason: String,
    },

    /// The bytes returned for the address hash to something else.
    #[error("content mismatch for {address}: bytes hash to {computed}")]
    ContentMismatch {
        address: ContentAddress,
        computed: ContentAddress,
    },

    /// The bytes are authentic but are not a block.
    #[error("malformed content at {address}: {source}")]
    MalformedContent {
        address: ContentAddress,
        #[source]
        source: CodecError,
    },
}

impl ResolveError {
    /// The address whose resolution failed.
    pub fn address(&self) -> &ContentAddress {
        match self {
            Self::ContentUnavailable { address, .. }
            | Self::ContentMismatch { address, .. }
            | Self::MalformedContent { address, .. } => address,
        }
    }

    /// Returns `true` if a later attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ContentUnavailable { .. })
    }
}
