use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::{ContentAddress, UserId};

/// Operation type tag, as written in block bodies and queue records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// A new user asks an existing member for an invite.
    RequestInvite,
    /// A member extends trust to another member.
    Trust,
}

impl OpCode {
    /// All op codes understood by schema version 1.
    pub const ALL: [OpCode; 2] = [OpCode::RequestInvite, OpCode::Trust];

    /// Wire name of this op code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestInvite => "REQUEST_INVITE",
            Self::Trust => "TRUST",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpCode {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| TypeError::UnknownOpCode(s.to_string()))
    }
}

/// Payload of a `REQUEST_INVITE` operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInviteData {
    /// Full name of the requesting user.
    pub full_name: String,
    /// Member the invite is requested from.
    pub to_uid: UserId,
    /// Content address of the invite video.
    pub video_hash: ContentAddress,
}

/// Payload of a `TRUST` operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustData {
    /// Member being trusted.
    pub to_uid: UserId,
}

/// Typed operation payload, one variant per supported op code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationData {
    RequestInvite(RequestInviteData),
    Trust(TrustData),
}

impl OperationData {
    /// The op code this payload is stored under.
    pub fn op_code(&self) -> OpCode {
        match self {
            Self::RequestInvite(_) => OpCode::RequestInvite,
            Self::Trust(_) => OpCode::Trust,
        }
    }

    /// The user this operation targets.
    pub fn target(&self) -> &UserId {
        match self {
            Self::RequestInvite(data) => &data.to_uid,
            Self::Trust(data) => &data.to_uid,
        }
    }
}

/// One application operation embedded in a block.
///
/// `sequence` is global across the whole chain and across schema versions:
/// an operation keeps its number even when a later schema version
/// represents it differently.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "OperationRepr", from = "OperationRepr")]
pub struct Operation {
    pub sequence: u64,
    pub creator_uid: UserId,
    pub data: OperationData,
}

impl Operation {
    pub fn new(sequence: u64, creator_uid: UserId, data: OperationData) -> Self {
        Self {
            sequence,
            creator_uid,
            data,
        }
    }

    pub fn op_code(&self) -> OpCode {
        self.data.op_code()
    }
}

/// Wire shape of an operation: the op code tag selects the `data` shape.
#[derive(Serialize, Deserialize)]
#[serde(tag = "op_code")]
enum OperationRepr {
    #[serde(rename = "REQUEST_INVITE")]
    RequestInvite {
        sequence: u64,
        creator_uid: UserId,
        data: RequestInviteData,
    },
    #[serde(rename = "TRUST")]
    Trust {
        sequence: u64,
        creator_uid: UserId,
        data: TrustData,
    },
}

impl From<Operation> for OperationRepr {
    fn from(op: Operation) -> Self {
        let Operation {
            sequence,
            creator_uid,
            data,
        } = op;
        match data {
            OperationData::RequestInvite(data) => Self::RequestInvite {
                sequence,
                creator_uid,
                data,
            },
            OperationData::Trust(data) => Self::Trust {
                sequence,
                creator_uid,
                data,
            },
        }
    }
}

impl From<OperationRepr> for Operation {
    fn from(repr: OperationRepr) -> Self {
        match repr {
            OperationRepr::RequestInvite {
                sequence,
                creator_uid,
                data,
            } => Operation::new(sequence, creator_uid, OperationData::RequestInvite(data)),
            OperationRepr::Trust {
                sequence,
                creator_uid,
                data,
            } => Operation::new(sequence, creator_uid, OperationData::Trust(data)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    #[test]
    fn op_code_parse() {
        assert_eq!("TRUST".parse::<OpCode>().unwrap(), OpCode::Trust);
        assert_eq!(
            "REQUEST_INVITE".parse::<OpCode>().unwrap(),
            OpCode::RequestInvite
        );
        assert_eq!(
            "MINT".parse::<OpCode>().unwrap_err(),
            TypeError::UnknownOpCode("MINT".into())
        );
    }

    #[test]
    fn trust_wire_shape() {
        let op = Operation::new(
            7,
            uid("alice"),
            OperationData::Trust(TrustData { to_uid: uid("bob") }),
        );
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "op_code": "TRUST",
                "sequence": 7,
                "creator_uid": "alice",
                "data": { "to_uid": "bob" }
            })
        );
        let parsed: Operation = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, op);
    }

    #[test]
    fn request_invite_decodes_from_block_json() {
        let json = r#"{
            "op_code": "REQUEST_INVITE",
            "sequence": 0,
            "creator_uid": "carol",
            "data": {
                "full_name": "Carol C",
                "to_uid": "alice",
                "video_hash": "QmTcHdEZNrKB3zb5XSUeMUy83kfVJCbxcbRuFqDYdDxdsa"
            }
        }"#;
        let op: Operation = serde_json::from_str(json).unwrap();
        assert_eq!(op.op_code(), OpCode::RequestInvite);
        assert_eq!(op.data.target(), &uid("alice"));
    }

    #[test]
    fn mismatched_data_shape_is_rejected() {
        let json = r#"{"op_code":"REQUEST_INVITE","sequence":0,"creator_uid":"c","data":{"to_uid":"a"}}"#;
        assert!(serde_json::from_str::<Operation>(json).is_err());
    }
}
