//! Chain assembly and block building for the virtual chain.
//!
//! `ChainAssembler` turns an account's anchor transactions into an ordered,
//! hash-verified sequence of blocks. `BlockBuilder` reads that chain and the
//! operation queue, builds the next block, publishes it to the content store
//! and anchors it on the ledger.
//!
//! Neither keeps state between calls. The ledger and the content store are
//! the only sources of truth, and every read goes back to them.

pub mod assembler;
pub mod builder;
pub mod config;
pub mod continuity;
pub mod coordinator;
pub mod error;

pub use assembler::{AssembledChain, ChainAssembler, ResolutionFailure, SequenceGap};
pub use builder::{BlockBuilder, CommittedBlock, PreparedBlock};
pub use config::{EngineConfig, FanoutPolicy};
pub use continuity::{ContinuityChecker, Violation};
pub use coordinator::{BuildCoordinator, BuildGuard, LocalBuildLock, Uncoordinated};
pub use error::{EngineError, EngineResult};
