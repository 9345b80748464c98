use vchain_types::ContentAddress;

/// Errors from codec operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    /// The decoded multihash prefix is not sha2-256 with a 32-byte digest.
    #[error("invalid address prefix {found:?} in {address}")]
    InvalidAddressPrefix {
        address: ContentAddress,
        found: Vec<u8>,
    },

    /// The address text is not valid base58.
    #[error("address {address} is not valid base58: {reason}")]
    InvalidBase58 {
        address: ContentAddress,
        reason: String,
    },

    /// A digest or anchor payload has the wrong number of bytes.
    #[error("invalid digest length: expected {expected}, got {actual}")]
    InvalidDigestLength { expected: usize, actual: usize },

    /// Block bytes could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
