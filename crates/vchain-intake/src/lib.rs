//! Operation intake for the virtual chain.
//!
//! Pending application operations wait in an external queue as untyped
//! records. Intake reads the unapplied ones, decodes them into the typed
//! chain schema, and runs each through a fail-fast rule pipeline against the
//! members known from the chain:
//!
//! - unknown op codes are dropped (newer producers must not break building)
//! - malformed records and operations whose preconditions fail are excluded
//!   from the block but stay queued for a later attempt
//!
//! Intake never marks records applied.

pub mod error;
pub mod intake;
pub mod queue;
pub mod record;
pub mod rule;
pub mod rules;
pub mod validator;

pub use error::{QueueError, QueueResult};
pub use intake::{
    DroppedRecord, Exclusion, ExclusionReason, IntakeBatch, IntakeReport, OperationIntake,
    PendingOperation,
};
pub use queue::{InMemoryOperationQueue, OperationQueue, QueueSnapshot};
pub use record::{Decoded, QueueRecord};
pub use rule::{MemberRegistry, OperationRule, RuleDecision};
pub use rules::{KnownTargetRule, NoSelfTargetRule, TrustedCreatorRule};
pub use validator::{OperationValidator, Verdict};
