use std::fmt;

use sha2::{Digest as _, Sha256};
use vchain_types::ContentAddress;

use crate::error::{CodecError, CodecResult};

/// Multihash prefix for sha2-256 (`0x12`) with a 32-byte digest (`0x20`).
pub const SHA2_256_PREFIX: [u8; 2] = [0x12, 0x20];

/// Length of a sha2-256 digest.
pub const DIGEST_LEN: usize = 32;

/// The raw digest carried in a ledger memo: a content address without its
/// multihash prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnchorPayload([u8; DIGEST_LEN]);

impl AnchorPayload {
    pub fn new(digest: [u8; DIGEST_LEN]) -> Self {
        Self(digest)
    }

    /// Parse a memo blob, which must be exactly one digest long.
    pub fn from_slice(bytes: &[u8]) -> CodecResult<Self> {
        let digest: [u8; DIGEST_LEN] =
            bytes
                .try_into()
                .map_err(|_| CodecError::InvalidDigestLength {
                    expected: DIGEST_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(digest))
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for AnchorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnchorPayload({})", hex::encode(&self.0[..4]))
    }
}

impl From<AnchorPayload> for [u8; DIGEST_LEN] {
    fn from(payload: AnchorPayload) -> Self {
        payload.0
    }
}

/// sha2-256 digest of a byte payload.
pub fn digest(bytes: &[u8]) -> [u8; DIGEST_LEN] {
    Sha256::digest(bytes).into()
}

/// Content address of a byte payload.
///
/// Pure: identical bytes always produce an identical address.
pub fn compute_content_address(bytes: &[u8]) -> ContentAddress {
    anchor_payload_to_address(&AnchorPayload(digest(bytes)))
}

/// Returns `true` if `bytes` hash to `address`.
pub fn verify_content(bytes: &[u8], address: &ContentAddress) -> bool {
    compute_content_address(bytes) == *address
}

/// Strip the fixed multihash prefix from an address, leaving the raw digest
/// that fits in a ledger memo.
///
/// Fails with [`CodecError::InvalidAddressPrefix`] for any prefix other than
/// sha2-256/32, so addresses using an unsupported hash scheme are never
/// anchored or accepted.
pub fn address_to_anchor_payload(address: &ContentAddress) -> CodecResult<AnchorPayload> {
    let decoded = bs58::decode(address.as_str())
        .into_vec()
        .map_err(|e| CodecError::InvalidBase58 {
            address: address.clone(),
            reason: e.to_string(),
        })?;

    let prefix_len = SHA2_256_PREFIX.len();
    if decoded.len() < prefix_len || decoded[..prefix_len] != SHA2_256_PREFIX {
        return Err(CodecError::InvalidAddressPrefix {
            address: address.clone(),
            found: decoded.iter().take(prefix_len).copied().collect(),
        });
    }

    AnchorPayload::from_slice(&decoded[prefix_len..])
}

/// Prepend the fixed multihash prefix to a raw digest and re-encode it.
pub fn anchor_payload_to_address(payload: &AnchorPayload) -> ContentAddress {
    let mut multihash = Vec::with_capacity(SHA2_256_PREFIX.len() + DIGEST_LEN);
    multihash.extend_from_slice(&SHA2_256_PREFIX);
    multihash.extend_from_slice(&payload.0);
    ContentAddress::from_encoded(bs58::encode(multihash).into_string())
}
