use std::fmt;

use vchain_types::{ContentAddress, VirtualBlock};

use crate::error::EngineError;

/// One way a sorted chain can fail to be hash-linked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    /// The first block of the sub-chain points at a predecessor.
    GenesisHasPrevHash {
        address: ContentAddress,
        prev_hash: ContentAddress,
    },
    /// The sub-chain starts after sequence 0, so its first block links to
    /// a predecessor that was not read.
    MissingGenesis {
        sequence: u64,
        address: ContentAddress,
    },
    /// Consecutive blocks whose link does not match.
    BrokenLink {
        sequence: u64,
        address: ContentAddress,
        expected: ContentAddress,
        found: Option<ContentAddress>,
    },
    /// Two different blocks claim the same position.
    DuplicateSequence {
        sequence: u64,
        first: ContentAddress,
        second: ContentAddress,
    },
    /// Positions between `after` and `next` are missing.
    SequenceGap {
        after: u64,
        next: u64,
        address: ContentAddress,
    },
}

impl Violation {
    pub fn is_gap(&self) -> bool {
        matches!(self, Self::SequenceGap { .. })
    }

    /// Sequence and address of the block the violation is reported against.
    pub fn location(&self) -> (u64, &ContentAddress) {
        match self {
            Self::GenesisHasPrevHash { address, .. } => (0, address),
            Self::MissingGenesis { sequence, address } => (*sequence, address),
            Self::BrokenLink {
                sequence, address, ..
            } => (*sequence, address),
            Self::DuplicateSequence {
                sequence, second, ..
            } => (*sequence, second),
            Self::SequenceGap { next, address, .. } => (*next, address),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GenesisHasPrevHash { prev_hash, .. } => {
                write!(f, "genesis block has prev_hash {prev_hash}")
            }
            Self::MissingGenesis { sequence, .. } => {
                write!(f, "chain starts at block {sequence}, no genesis block")
            }
            Self::BrokenLink {
                expected, found, ..
            } => match found {
                Some(found) => write!(f, "prev_hash {found} does not match predecessor {expected}"),
                None => write!(f, "missing prev_hash, predecessor is {expected}"),
            },
            Self::DuplicateSequence { first, .. } => {
                write!(f, "sequence already taken by {first}")
            }
            Self::SequenceGap { after, next, .. } => {
                write!(f, "gap: block {after} is followed by block {next}")
            }
        }
    }
}

impl From<Violation> for EngineError {
    fn from(violation: Violation) -> Self {
        let (sequence, address) = violation.location();
        EngineError::ChainDiscontinuity {
            sequence,
            address: address.clone(),
            detail: violation.to_string(),
        }
    }
}

/// Checks the hash links of a chain sorted by block sequence.
///
/// Only neighbours are compared: a pair one sequence apart must be linked,
/// a pair further apart is reported as a gap without a link check, since
/// the block in between is what it would link to.
pub struct ContinuityChecker;

impl ContinuityChecker {
    /// Every violation in `blocks`, in chain order. Empty for a valid chain.
    pub fn check(blocks: &[VirtualBlock]) -> Vec<Violation> {
        let mut violations = Vec::new();

        if let Some(first) = blocks.first() {
            if first.sequence() > 0 {
                violations.push(Violation::MissingGenesis {
                    sequence: first.sequence(),
                    address: first.address().clone(),
                });
            } else if let Some(prev) = &first.data.prev_hash {
                violations.push(Violation::GenesisHasPrevHash {
                    address: first.address().clone(),
                    prev_hash: prev.clone(),
                });
            }
        }

        for pair in blocks.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.sequence() == prev.sequence() {
                violations.push(Violation::DuplicateSequence {
                    sequence: next.sequence(),
                    first: prev.address().clone(),
                    second: next.address().clone(),
                });
            } else if next.sequence() == prev.sequence() + 1 {
                if next.data.prev_hash.as_ref() != Some(prev.address()) {
                    violations.push(Violation::BrokenLink {
                        sequence: next.sequence(),
                        address: next.address().clone(),
                        expected: prev.address().clone(),
                        found: next.data.prev_hash.clone(),
                    });
                }
            } else {
                violations.push(Violation::SequenceGap {
                    after: prev.sequence(),
                    next: next.sequence(),
                    address: next.address().clone(),
                });
            }
        }

        violations
    }

    /// `Ok` only if `blocks` is fully linked.
    pub fn verify(blocks: &[VirtualBlock]) -> Result<(), Violation> {
        match Self::check(blocks).into_iter().next() {
            Some(violation) => Err(violation),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use vchain_codec::compute_content_address;
    use vchain_types::{AnchorId, AnchorRecord, Block, SchemaVersion};

    use super::*;

    fn addr(tag: &str) -> ContentAddress {
        compute_content_address(tag.as_bytes())
    }

    fn vb(sequence: u64, tag: &str, prev: Option<&str>) -> VirtualBlock {
        VirtualBlock::new(
            AnchorRecord {
                content_address: addr(tag),
                anchor_id: AnchorId::new(format!("tx-{tag}")).unwrap(),
                observed_at: None,
            },
            Block::new(sequence, SchemaVersion::V1, prev.map(addr), vec![]),
        )
    }

    #[test]
    fn linked_chain_passes() {
        let chain = vec![vb(0, "a", None), vb(1, "b", Some("a")), vb(2, "c", Some("b"))];
        assert!(ContinuityChecker::check(&chain).is_empty());
        assert!(ContinuityChecker::verify(&chain).is_ok());
        assert!(ContinuityChecker::verify(&[]).is_ok());
    }

    #[test]
    fn broken_link_detected() {
        let chain = vec![vb(0, "a", None), vb(1, "b", Some("zzz"))];
        let violation = ContinuityChecker::verify(&chain).unwrap_err();
        assert_eq!(
            violation,
            Violation::BrokenLink {
                sequence: 1,
                address: addr("b"),
                expected: addr("a"),
                found: Some(addr("zzz")),
            }
        );
        let err = EngineError::from(violation);
        assert!(matches!(err, EngineError::ChainDiscontinuity { sequence: 1, .. }));
    }

    #[test]
    fn missing_link_detected() {
        let chain = vec![vb(0, "a", None), vb(1, "b", None)];
        assert!(matches!(
            ContinuityChecker::verify(&chain),
            Err(Violation::BrokenLink { found: None, .. })
        ));
    }

    #[test]
    fn genesis_with_prev_hash_detected() {
        let chain = vec![vb(0, "a", Some("elsewhere"))];
        assert!(matches!(
            ContinuityChecker::verify(&chain),
            Err(Violation::GenesisHasPrevHash { .. })
        ));
    }

    #[test]
    fn duplicate_and_gap_detected() {
        let chain = vec![
            vb(0, "a", None),
            vb(0, "a2", None),
            vb(3, "d", Some("c")),
        ];
        let violations = ContinuityChecker::check(&chain);
        assert_eq!(violations.len(), 2);
        assert!(matches!(violations[0], Violation::DuplicateSequence { sequence: 0, .. }));
        assert!(violations[1].is_gap());
        assert_eq!(violations[1].to_string(), "gap: block 0 is followed by block 3");
    }

    #[test]
    fn chain_starting_after_genesis_is_reported_once() {
        let chain = vec![vb(5, "f", Some("e")), vb(6, "g", Some("f"))];
        let violations = ContinuityChecker::check(&chain);
        assert_eq!(
            violations,
            vec![Violation::MissingGenesis {
                sequence: 5,
                address: addr("f"),
            }]
        );
        let err = EngineError::from(violations[0].clone());
        assert!(matches!(err, EngineError::ChainDiscontinuity { sequence: 5, .. }));
    }
}
