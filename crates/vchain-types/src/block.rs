use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::ContentAddress;
use crate::operation::Operation;

/// `prev_hash` of the first block of a schema version's sub-chain.
pub const GENESIS_PREV_HASH: Option<ContentAddress> = None;

/// Block schema version.
///
/// The logical chain is partitioned into one sub-chain per schema version.
/// Readers are configured with the version they support; blocks of any other
/// version are excluded from the assembled view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaVersion(pub u32);

impl SchemaVersion {
    /// The first schema with typed operations and cross-version links.
    pub const V1: Self = Self(1);
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::V1
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// One unit of the application log as stored in the content store.
///
/// Field order is the serialization order and must not change: the content
/// address is computed over the serialized bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Ordinal position in the chain, 0-indexed, independent of operation sequences.
    pub sequence: u64,
    pub version: SchemaVersion,
    /// When the earliest version of this block was created. Absent for a
    /// block first written under this schema; see the anchor's timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_created: Option<DateTime<Utc>>,
    /// The same block in the previous schema version of the chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_version_hash: Option<ContentAddress>,
    /// Previous block in this schema version; `None` for the genesis block.
    pub prev_hash: Option<ContentAddress>,
    pub operations: Vec<Operation>,
}

impl Block {
    /// A block with no cross-version history.
    pub fn new(
        sequence: u64,
        version: SchemaVersion,
        prev_hash: Option<ContentAddress>,
        operations: Vec<Operation>,
    ) -> Self {
        Self {
            sequence,
            version,
            origin_created: None,
            prev_version_hash: None,
            prev_hash,
            operations,
        }
    }

    /// Returns `true` if this block starts its version's sub-chain.
    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_none()
    }

    /// Highest operation sequence number in this block, if any.
    pub fn max_operation_sequence(&self) -> Option<u64> {
        self.operations.iter().map(|op| op.sequence).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_block_serializes_null_prev_hash() {
        let block = Block::new(0, SchemaVersion::V1, GENESIS_PREV_HASH, vec![]);
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "sequence": 0,
                "version": 1,
                "prev_hash": null,
                "operations": []
            })
        );
        assert!(block.is_genesis());
    }

    #[test]
    fn optional_history_fields_roundtrip() {
        let mut block = Block::new(
            4,
            SchemaVersion::V1,
            Some(ContentAddress::parse("QmPrev").unwrap()),
            vec![],
        );
        block.prev_version_hash = Some(ContentAddress::parse("QmHistory").unwrap());
        block.origin_created = Some("2018-06-01T12:00:00Z".parse().unwrap());

        let json = serde_json::to_string(&block).unwrap();
        let parsed: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, block);
        assert!(!parsed.is_genesis());
    }

    #[test]
    fn missing_optional_fields_decode_as_none() {
        let parsed: Block =
            serde_json::from_str(r#"{"sequence":3,"version":1,"prev_hash":null,"operations":[]}"#)
                .unwrap();
        assert_eq!(parsed.origin_created, None);
        assert_eq!(parsed.prev_version_hash, None);
        assert_eq!(parsed.max_operation_sequence(), None);
    }

    #[test]
    fn version_display() {
        assert_eq!(SchemaVersion::default().to_string(), "v1");
    }
}
