use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vchain_types::{AccountId, AnchorId};

use crate::error::{LedgerError, LedgerResult};

/// Most records a ledger returns for one page of a transaction listing.
pub const MAX_PAGE_LIMIT: u32 = 200;

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Ordering of a transaction listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    Asc,
    #[default]
    Desc,
}

/// One page request against an account's transaction history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionQuery {
    pub order: Order,
    pub limit: u32,
    /// Opaque position returned as `next_cursor` by the previous page.
    pub cursor: Option<String>,
}

impl TransactionQuery {
    /// Most-recent-first, one full page.
    pub fn latest() -> Self {
        Self {
            order: Order::Desc,
            limit: MAX_PAGE_LIMIT,
            cursor: None,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }
}

/// A page of transactions plus the cursor of the next page, if any.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionPage {
    pub records: Vec<LedgerTransaction>,
    pub next_cursor: Option<String>,
}

/// A confirmed ledger transaction as returned by a listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: AnchorId,
    pub source_account: AccountId,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_hex_bytes")]
    pub memo: Option<Vec<u8>>,
    /// Encoded [`TransactionMeta`].
    #[serde(with = "hex_bytes")]
    pub result_meta: Vec<u8>,
}

impl LedgerTransaction {
    /// Decode the transaction's result metadata.
    pub fn meta(&self) -> LedgerResult<TransactionMeta> {
        TransactionMeta::decode(&self.result_meta)
    }
}

// ---------------------------------------------------------------------------
// Result metadata
// ---------------------------------------------------------------------------

/// Ledger-entry changes caused by a transaction, grouped per operation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMeta {
    pub operations: Vec<OperationMeta>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationMeta {
    pub changes: Vec<EntryChange>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Removed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryChange {
    pub kind: ChangeKind,
    pub entry: LedgerEntry,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEntry {
    Account { account_id: AccountId, sequence: u64 },
    Data(DataEntry),
}

/// A named key/value entry attached to an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEntry {
    pub account_id: AccountId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_hex_bytes")]
    pub value: Option<Vec<u8>>,
}

impl TransactionMeta {
    pub fn decode(bytes: &[u8]) -> LedgerResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    pub fn encode(&self) -> LedgerResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    /// The first data-entry change of the first operation.
    ///
    /// Anchor transactions name themselves through this entry.
    pub fn first_data_entry(&self) -> Option<&DataEntry> {
        self.operations
            .first()?
            .changes
            .iter()
            .find_map(|change| match &change.entry {
                LedgerEntry::Data(data) => Some(data),
                LedgerEntry::Account { .. } => None,
            })
    }
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// Set, replace or (with `value: None`) delete a data entry on the source account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManageData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_hex_bytes")]
    pub value: Option<Vec<u8>>,
}

/// An unsigned transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    pub source_account: AccountId,
    /// Must be the account's current sequence plus one.
    pub sequence: u64,
    pub operations: Vec<ManageData>,
    /// 32-byte hash memo.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_hex_bytes")]
    pub memo: Option<Vec<u8>>,
}

impl TransactionEnvelope {
    /// Bytes covered by the signature.
    pub fn signing_bytes(&self) -> LedgerResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }
}

/// An envelope plus the source account's ed25519 signature over it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub envelope: TransactionEnvelope,
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
}

/// What the ledger reports back for an accepted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub id: AnchorId,
    pub created_at: DateTime<Utc>,
}

/// Current state of a ledger account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub account: AccountId,
    pub sequence: u64,
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text).map_err(serde::de::Error::custom)
    }
}

mod opt_hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_some(&hex::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?;
        text.map(|t| hex::decode(t).map_err(serde::de::Error::custom))
            .transpose()
    }
}
