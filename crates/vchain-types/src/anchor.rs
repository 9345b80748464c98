use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::id::{AnchorId, ContentAddress};

/// What the ledger records about one committed block.
///
/// Produced by parsing one anchor transaction and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRecord {
    pub content_address: ContentAddress,
    pub anchor_id: AnchorId,
    /// Ledger confirmation time. Absent only for anchors whose submission
    /// receipt did not report one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
}

/// The runtime join of an anchor record and its resolved block.
///
/// Built fresh on every assembly pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualBlock {
    pub metadata: AnchorRecord,
    pub data: Block,
}

impl VirtualBlock {
    pub fn new(metadata: AnchorRecord, data: Block) -> Self {
        Self { metadata, data }
    }

    /// Content address of the block body.
    pub fn address(&self) -> &ContentAddress {
        &self.metadata.content_address
    }

    /// Block sequence number.
    pub fn sequence(&self) -> u64 {
        self.data.sequence
    }
}
