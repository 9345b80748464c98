use vchain_types::{OpCode, Operation};

use crate::rule::{MemberRegistry, OperationRule, RuleDecision};

/// Only members can extend trust. Invite requests come from outsiders by
/// definition and are not checked here.
pub struct TrustedCreatorRule;

impl OperationRule for TrustedCreatorRule {
    fn name(&self) -> &str {
        "trusted-creator"
    }

    fn evaluate(&self, op: &Operation, members: &MemberRegistry) -> RuleDecision {
        if op.op_code() == OpCode::Trust && !members.contains(&op.creator_uid) {
            return RuleDecision::fail(format!("creator {} is not a member", op.creator_uid));
        }
        RuleDecision::Pass
    }
}
