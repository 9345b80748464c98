use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;
use vchain_types::Operation;

use crate::error::QueueResult;
use crate::queue::OperationQueue;
use crate::record::Decoded;
use crate::rule::MemberRegistry;
use crate::validator::{OperationValidator, Verdict};

/// A decoded operation together with the queue record it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingOperation {
    pub queue_id: Uuid,
    pub operation: Operation,
}

/// Why a record stays queued instead of entering the next block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExclusionReason {
    Malformed(String),
    ValidationFailed { rule: String, reason: String },
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(reason) => write!(f, "malformed: {reason}"),
            Self::ValidationFailed { rule, reason } => write!(f, "{rule}: {reason}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exclusion {
    pub queue_id: Uuid,
    pub op_code: String,
    pub reason: ExclusionReason,
}

/// A record with an op code this schema does not know.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DroppedRecord {
    pub queue_id: Uuid,
    pub op_code: String,
}

/// Decoded queue contents, before chain-state validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntakeBatch {
    /// Known operations in queue order, sequenced `0..n` provisionally.
    pub candidates: Vec<PendingOperation>,
    pub excluded: Vec<Exclusion>,
    pub dropped: Vec<DroppedRecord>,
}

/// Final intake result for one block build.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntakeReport {
    /// Operations that enter the block, in queue order.
    pub accepted: Vec<PendingOperation>,
    pub excluded: Vec<Exclusion>,
    pub dropped: Vec<DroppedRecord>,
}

impl IntakeReport {
    pub fn operations(&self) -> Vec<Operation> {
        self.accepted.iter().map(|p| p.operation.clone()).collect()
    }

    pub fn queue_ids(&self) -> Vec<Uuid> {
        self.accepted.iter().map(|p| p.queue_id).collect()
    }
}

/// Pulls pending operations off the queue and filters them against chain
/// state.
pub struct OperationIntake {
    queue: Arc<dyn OperationQueue>,
    validator: OperationValidator,
}

impl OperationIntake {
    /// Intake with the default rule pipeline.
    pub fn new(queue: Arc<dyn OperationQueue>) -> Self {
        Self::with_validator(queue, OperationValidator::with_default_rules())
    }

    pub fn with_validator(queue: Arc<dyn OperationQueue>, validator: OperationValidator) -> Self {
        Self { queue, validator }
    }

    pub fn validator(&self) -> &OperationValidator {
        &self.validator
    }

    /// Read and decode every unapplied record.
    ///
    /// Unknown op codes are dropped and malformed records excluded; neither
    /// is an error.
    pub async fn collect_pending_operations(&self) -> QueueResult<IntakeBatch> {
        let records = self.queue.query_unapplied().await?;
        let mut batch = IntakeBatch::default();

        for record in &records {
            let provisional = batch.candidates.len() as u64;
            match record.decode(provisional) {
                Decoded::Known(operation) => batch.candidates.push(PendingOperation {
                    queue_id: record.id,
                    operation,
                }),
                Decoded::Unknown(op_code) => {
                    debug!(id = %record.id, %op_code, "dropping record with unknown op code");
                    batch.dropped.push(DroppedRecord {
                        queue_id: record.id,
                        op_code,
                    });
                }
                Decoded::Malformed { reason } => {
                    warn!(id = %record.id, op_code = %record.op_code, %reason, "excluding malformed record");
                    batch.excluded.push(Exclusion {
                        queue_id: record.id,
                        op_code: record.op_code.clone(),
                        reason: ExclusionReason::Malformed(reason),
                    });
                }
            }
        }

        debug!(
            records = records.len(),
            candidates = batch.candidates.len(),
            "collected pending operations"
        );
        Ok(batch)
    }

    /// Check candidates against chain state, in queue order.
    ///
    /// Each accepted operation updates `members` before the next candidate is
    /// checked, so an invite request and a trust toward the new member can
    /// land in the same block.
    pub fn validate(&self, batch: IntakeBatch, mut members: MemberRegistry) -> IntakeReport {
        let IntakeBatch {
            candidates,
            mut excluded,
            dropped,
        } = batch;
        let mut accepted = Vec::with_capacity(candidates.len());

        for pending in candidates {
            match self.validator.evaluate(&pending.operation, &members) {
                Verdict::Accepted => {
                    members.observe(&pending.operation);
                    accepted.push(pending);
                }
                Verdict::Rejected { rule, reason } => {
                    debug!(id = %pending.queue_id, %rule, %reason, "operation left queued");
                    excluded.push(Exclusion {
                        queue_id: pending.queue_id,
                        op_code: pending.operation.op_code().to_string(),
                        reason: ExclusionReason::ValidationFailed { rule, reason },
                    });
                }
            }
        }

        info!(
            accepted = accepted.len(),
            excluded = excluded.len(),
            dropped = dropped.len(),
            "operation intake complete"
        );
        IntakeReport {
            accepted,
            excluded,
            dropped,
        }
    }
}

impl fmt::Debug for OperationIntake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationIntake")
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}
