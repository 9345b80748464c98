use vchain_types::Operation;

use crate::rule::{MemberRegistry, OperationRule, RuleDecision};

/// Nobody invites or trusts themselves.
pub struct NoSelfTargetRule;

impl OperationRule for NoSelfTargetRule {
    fn name(&self) -> &str {
        "no-self-target"
    }

    fn evaluate(&self, op: &Operation, _members: &MemberRegistry) -> RuleDecision {
        if op.data.target() == &op.creator_uid {
            return RuleDecision::fail(format!("{} targets its own creator", op.op_code()));
        }
        RuleDecision::Pass
    }
}
