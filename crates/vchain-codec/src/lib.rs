//! Content codec for the virtual chain.
//!
//! Block bodies are named by a sha2-256 multihash: the two-byte
//! function/length prefix `0x12 0x20` followed by the 32-byte digest, base58
//! encoded. A ledger memo only has room for the digest, so anchoring strips
//! the prefix and reading puts it back.
//!
//! Decoding never accepts a prefix other than the fixed one: an address that
//! names a different hash function is an error, not a silent conversion.
//!
//! All codec operations wrap established libraries (`sha2`, `bs58`,
//! `serde_json`).

pub mod canonical;
pub mod error;
pub mod multihash;

pub use canonical::{decode_block, decode_header, encode_block, BlockHeader};
pub use error::{CodecError, CodecResult};
pub use multihash::{
    address_to_anchor_payload, anchor_payload_to_address, compute_content_address, digest,
    verify_content, AnchorPayload, DIGEST_LEN, SHA2_256_PREFIX,
};
