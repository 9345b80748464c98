use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid content address {value:?}: {reason}")]
    InvalidAddress { value: String, reason: String },

    #[error("invalid {kind}: must not be empty")]
    EmptyIdentifier { kind: &'static str },

    #[error("unknown op code: {0}")]
    UnknownOpCode(String),
}
