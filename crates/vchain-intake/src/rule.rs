use std::collections::HashSet;

use vchain_types::{Block, OpCode, Operation, UserId};

// ---------------------------------------------------------------------------
// MemberRegistry
// ---------------------------------------------------------------------------

/// Users known to exist on the chain.
///
/// Seeded with configured genesis members, then grown by every
/// `REQUEST_INVITE` creator: requesting an invite is how a user joins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemberRegistry {
    members: HashSet<UserId>,
}

impl MemberRegistry {
    pub fn new(genesis_members: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            members: genesis_members.into_iter().collect(),
        }
    }

    /// Registry for a chain: genesis members plus every member that joined
    /// in `blocks`.
    pub fn from_chain<'a>(
        genesis_members: impl IntoIterator<Item = UserId>,
        blocks: impl IntoIterator<Item = &'a Block>,
    ) -> Self {
        let mut registry = Self::new(genesis_members);
        for op in blocks.into_iter().flat_map(|b| b.operations.iter()) {
            registry.observe(op);
        }
        registry
    }

    /// Account for an operation that is now part of the chain.
    pub fn observe(&mut self, op: &Operation) {
        if op.op_code() == OpCode::RequestInvite {
            self.members.insert(op.creator_uid.clone());
        }
    }

    pub fn contains(&self, uid: &UserId) -> bool {
        self.members.contains(uid)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

// ---------------------------------------------------------------------------
// RuleDecision
// ---------------------------------------------------------------------------

/// The outcome of one rule for one operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuleDecision {
    Pass,
    /// The operation's precondition does not hold yet. It stays queued.
    Fail { reason: String },
}

impl RuleDecision {
    pub fn fail(reason: impl Into<String>) -> Self {
        Self::Fail {
            reason: reason.into(),
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

// ---------------------------------------------------------------------------
// OperationRule trait
// ---------------------------------------------------------------------------

/// A chain-state precondition checked for every candidate operation.
///
/// Object-safe and `Send + Sync` so rules can live in a
/// `Vec<Box<dyn OperationRule>>`.
pub trait OperationRule: Send + Sync {
    /// Short name used in exclusion reports (e.g. "known-target").
    fn name(&self) -> &str;

    fn evaluate(&self, op: &Operation, members: &MemberRegistry) -> RuleDecision;
}

#[cfg(test)]
mod tests {
    use vchain_types::{ContentAddress, OperationData, RequestInviteData, SchemaVersion, TrustData};

    use super::*;

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn invite(creator: &str, to: &str) -> Operation {
        Operation::new(
            0,
            uid(creator),
            OperationData::RequestInvite(RequestInviteData {
                full_name: creator.to_uppercase(),
                to_uid: uid(to),
                video_hash: ContentAddress::parse("QmVideo").unwrap(),
            }),
        )
    }

    #[test]
    fn registry_learns_from_invites_only() {
        let trust = Operation::new(
            1,
            uid("mallory"),
            OperationData::Trust(TrustData { to_uid: uid("root") }),
        );
        let block = Block::new(0, SchemaVersion::V1, None, vec![invite("alice", "root"), trust]);
        let registry = MemberRegistry::from_chain([uid("root")], [&block]);

        assert!(registry.contains(&uid("root")));
        assert!(registry.contains(&uid("alice")));
        assert!(!registry.contains(&uid("mallory")));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn empty_registry() {
        let registry = MemberRegistry::default();
        assert!(registry.is_empty());
        assert!(RuleDecision::Pass.is_pass());
        assert!(!RuleDecision::fail("no").is_pass());
    }
}
