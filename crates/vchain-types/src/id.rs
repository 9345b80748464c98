use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Self-describing, hash-derived name of a byte payload.
///
/// A `ContentAddress` is the base58 encoding of a multihash: a short
/// function/length prefix followed by the raw digest. This type only
/// guarantees the textual form is well-formed base58; checking the prefix and
/// digest length is the codec's job (see `vchain-codec`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentAddress(String);

impl ContentAddress {
    /// Parse a textual address, rejecting empty strings and non-base58 characters.
    pub fn parse(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        if value.is_empty() {
            return Err(TypeError::InvalidAddress {
                value,
                reason: "address must not be empty".into(),
            });
        }
        if let Err(e) = bs58::decode(&value).into_vec() {
            return Err(TypeError::InvalidAddress {
                reason: format!("not base58: {e}"),
                value,
            });
        }
        Ok(Self(value))
    }

    /// Wrap text produced by a base58 encoder without re-validating it.
    pub fn from_encoded(value: String) -> Self {
        Self(value)
    }

    /// The textual address.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 10 characters) for log lines.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(10);
        &self.0[..end]
    }
}

impl fmt::Debug for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentAddress({})", self.0)
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentAddress {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContentAddress {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ContentAddress> for String {
    fn from(address: ContentAddress) -> Self {
        address.0
    }
}

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident, $kind:literal) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Wrap a non-empty identifier.
            pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
                let value = value.into();
                if value.is_empty() {
                    return Err(TypeError::EmptyIdentifier { kind: $kind });
                }
                Ok(Self(value))
            }

            /// Wrap a value produced by an encoder that never yields an empty string.
            pub fn from_trusted(value: String) -> Self {
                debug_assert!(!value.is_empty());
                Self(value)
            }

            /// The identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypeError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

string_id!(
    /// Ledger-native transaction identifier of an anchor. Globally unique and
    /// immutable once the transaction is confirmed.
    AnchorId,
    "anchor id"
);

string_id!(
    /// Ledger account that owns the chain's anchor transactions.
    AccountId,
    "account id"
);

string_id!(
    /// Application user identifier referenced by operations.
    UserId,
    "user id"
);
