use vchain_types::Operation;

use crate::rule::{MemberRegistry, OperationRule, RuleDecision};

/// The user an operation targets must already be a member.
pub struct KnownTargetRule;

impl OperationRule for KnownTargetRule {
    fn name(&self) -> &str {
        "known-target"
    }

    fn evaluate(&self, op: &Operation, members: &MemberRegistry) -> RuleDecision {
        let target = op.data.target();
        if members.contains(target) {
            RuleDecision::Pass
        } else {
            RuleDecision::fail(format!("target {target} is not a member"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::fixtures::*;

    #[test]
    fn passes_for_member_target() {
        let decision = KnownTargetRule.evaluate(&trust("alice", "bob"), &members(&["bob"]));
        assert!(decision.is_pass());
    }

    #[test]
    fn fails_for_unknown_target() {
        let decision = KnownTargetRule.evaluate(&invite("carol", "ghost"), &members(&["bob"]));
        assert_eq!(decision, RuleDecision::fail("target ghost is not a member"));
    }
}
