//! Foundation types for the virtual chain.
//!
//! The virtual chain is an append-only log split across two external
//! systems: a public ledger holds ordered anchor transactions that point at
//! content hashes, and a content-addressable store holds the block bodies.
//! Every other `vchain` crate depends on `vchain-types`.
//!
//! # Key Types
//!
//! - [`ContentAddress`]: self-describing, hash-derived name of a block body
//! - [`AnchorId`] / [`AccountId`]: ledger-native identifiers
//! - [`Block`]: one unit of the log, schema-versioned and hash-linked
//! - [`Operation`] / [`OperationData`]: application operations embedded in a block
//! - [`AnchorRecord`]: what the ledger says about one committed block
//! - [`VirtualBlock`]: the join of an anchor record and its resolved block

pub mod anchor;
pub mod block;
pub mod error;
pub mod id;
pub mod operation;

pub use anchor::{AnchorRecord, VirtualBlock};
pub use block::{Block, SchemaVersion, GENESIS_PREV_HASH};
pub use error::TypeError;
pub use id::{AccountId, AnchorId, ContentAddress, UserId};
pub use operation::{OpCode, Operation, OperationData, RequestInviteData, TrustData};
