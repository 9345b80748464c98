use vchain_types::Operation;

use crate::rule::{MemberRegistry, OperationRule, RuleDecision};
use crate::rules::{KnownTargetRule, NoSelfTargetRule, TrustedCreatorRule};

/// Outcome of running one operation through the rule pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected { rule: String, reason: String },
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// An ordered pipeline of [`OperationRule`]s.
///
/// Evaluation is fail-fast: the first failing rule rejects the operation.
/// An empty pipeline accepts everything.
pub struct OperationValidator {
    rules: Vec<Box<dyn OperationRule>>,
}

impl OperationValidator {
    /// An empty pipeline.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// NoSelfTarget -> TrustedCreator -> KnownTarget
    pub fn with_default_rules() -> Self {
        let mut validator = Self::new();
        validator.add_rule(Box::new(NoSelfTargetRule));
        validator.add_rule(Box::new(TrustedCreatorRule));
        validator.add_rule(Box::new(KnownTargetRule));
        validator
    }

    /// Append a rule to the end of the pipeline.
    pub fn add_rule(&mut self, rule: Box<dyn OperationRule>) {
        self.rules.push(rule);
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn evaluate(&self, op: &Operation, members: &MemberRegistry) -> Verdict {
        for rule in &self.rules {
            if let RuleDecision::Fail { reason } = rule.evaluate(op, members) {
                return Verdict::Rejected {
                    rule: rule.name().to_string(),
                    reason,
                };
            }
        }
        Verdict::Accepted
    }
}

impl Default for OperationValidator {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

impl std::fmt::Debug for OperationValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.rules.iter().map(|r| r.name()).collect();
        f.debug_struct("OperationValidator")
            .field("rules", &names)
            .finish()
    }
}
