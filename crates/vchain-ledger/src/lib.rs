//! Ledger boundary for the virtual chain.
//!
//! The chain's integrity anchors live on a public transaction ledger. This
//! crate provides:
//! - `LedgerService`, the async contract the engine needs from a ledger
//! - transaction, metadata and envelope records
//! - `SigningCredential`, the ed25519 key that controls the chain account
//! - `InMemoryLedger` for tests, sandboxes and embedding
//! - `AnchorReader`, which recognizes anchor transactions and extracts the
//!   content address each one points at

pub mod anchors;
pub mod error;
pub mod memory;
pub mod records;
pub mod signing;
pub mod traits;

pub use anchors::{AnchorListing, AnchorReader, DEFAULT_ANCHOR_PREFIX};
pub use error::{AnchorError, LedgerError, LedgerResult};
pub use memory::{AccountRecord, InMemoryLedger, LedgerSnapshot};
pub use records::{
    AccountState, ChangeKind, DataEntry, EntryChange, LedgerEntry, LedgerTransaction, ManageData,
    OperationMeta, Order, SignedTransaction, SubmitReceipt, TransactionEnvelope, TransactionMeta,
    TransactionPage, TransactionQuery, MAX_PAGE_LIMIT,
};
pub use signing::{account_id_for_key, verify_signature, verify_transaction, SigningCredential};
pub use traits::LedgerService;
