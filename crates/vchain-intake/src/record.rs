use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vchain_types::{OpCode, Operation, OperationData, RequestInviteData, TrustData, UserId};

/// A raw entry of the pending-operations queue.
///
/// Fields are untyped as the queue stores them; [`QueueRecord::decode`]
/// maps them onto the chain schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueueRecord {
    pub id: Uuid,
    pub op_code: String,
    pub creator_uid: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub applied: bool,
    pub created_at: DateTime<Utc>,
}

impl QueueRecord {
    /// A new, unapplied record with a time-ordered id.
    pub fn new(
        op_code: impl Into<String>,
        creator_uid: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            op_code: op_code.into(),
            creator_uid: creator_uid.into(),
            data,
            applied: false,
            created_at: Utc::now(),
        }
    }

    /// Map this record onto the chain schema.
    ///
    /// `sequence` is a provisional index; the block builder assigns the
    /// final chain-wide number.
    pub fn decode(&self, sequence: u64) -> Decoded {
        let Ok(op_code) = self.op_code.parse::<OpCode>() else {
            return Decoded::Unknown(self.op_code.clone());
        };

        let creator_uid = match UserId::new(self.creator_uid.clone()) {
            Ok(uid) => uid,
            Err(e) => return Decoded::Malformed { reason: e.to_string() },
        };

        let data = match op_code {
            OpCode::RequestInvite => serde_json::from_value::<RequestInviteData>(self.data.clone())
                .map(OperationData::RequestInvite),
            OpCode::Trust => {
                serde_json::from_value::<TrustData>(self.data.clone()).map(OperationData::Trust)
            }
        };

        match data {
            Ok(data) => Decoded::Known(Operation::new(sequence, creator_uid, data)),
            Err(e) => Decoded::Malformed {
                reason: format!("{op_code} data: {e}"),
            },
        }
    }
}

/// Result of decoding one queue record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decoded {
    Known(Operation),
    /// An op code this schema does not know. Dropped so that newer producers
    /// cannot break block building.
    Unknown(String),
    /// A known op code whose fields do not fit its shape.
    Malformed { reason: String },
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_trust() {
        let record = QueueRecord::new("TRUST", "alice", json!({ "to_uid": "bob" }));
        let Decoded::Known(op) = record.decode(3) else {
            panic!("expected a known operation");
        };
        assert_eq!(op.sequence, 3);
        assert_eq!(op.creator_uid.as_str(), "alice");
        assert_eq!(op.data.target().as_str(), "bob");
    }

    #[test]
    fn decodes_request_invite() {
        let record = QueueRecord::new(
            "REQUEST_INVITE",
            "carol",
            json!({
                "full_name": "Carol Example",
                "to_uid": "alice",
                "video_hash": "QmTcHdEZNrKB3zb5XSUeMUy83kfVJCbxcbRuFqDYdDxdsa"
            }),
        );
        let Decoded::Known(op) = record.decode(0) else {
            panic!("expected a known operation");
        };
        assert_eq!(op.op_code(), OpCode::RequestInvite);
    }

    #[test]
    fn unknown_op_code_is_reported_not_failed() {
        let record = QueueRecord::new("MINT", "alice", json!({ "amount": 5 }));
        assert_eq!(record.decode(0), Decoded::Unknown("MINT".into()));
    }

    #[test]
    fn wrong_shape_is_malformed() {
        let missing = QueueRecord::new("TRUST", "alice", json!({}));
        assert!(matches!(missing.decode(0), Decoded::Malformed { .. }));

        let bad_hash = QueueRecord::new(
            "REQUEST_INVITE",
            "carol",
            json!({ "full_name": "C", "to_uid": "alice", "video_hash": "not-a-hash!" }),
        );
        assert!(matches!(bad_hash.decode(0), Decoded::Malformed { .. }));

        let no_creator = QueueRecord::new("TRUST", "", json!({ "to_uid": "bob" }));
        assert!(matches!(no_creator.decode(0), Decoded::Malformed { .. }));
    }

    #[test]
    fn new_records_are_unapplied_and_distinct() {
        let a = QueueRecord::new("TRUST", "a", json!({}));
        let b = QueueRecord::new("TRUST", "a", json!({}));
        assert!(!a.applied);
        assert_ne!(a.id, b.id);
    }
}
