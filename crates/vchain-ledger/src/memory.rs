use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use vchain_types::{AccountId, AnchorId};

use crate::error::{LedgerError, LedgerResult};
use crate::records::{
    AccountState, ChangeKind, DataEntry, EntryChange, LedgerEntry, LedgerTransaction, OperationMeta,
    Order, SignedTransaction, SubmitReceipt, TransactionMeta, TransactionPage, TransactionQuery,
    MAX_PAGE_LIMIT,
};
use crate::signing::verify_transaction;
use crate::traits::LedgerService;

/// In-memory ledger for tests, local sandboxes, and embedding.
///
/// Enforces the same submission rules as a real ledger: the source account
/// must exist, the envelope sequence must be the next one, and the signature
/// must verify against the account's public key.
pub struct InMemoryLedger {
    state: RwLock<LedgerSnapshot>,
    offline: AtomicBool,
}

/// Serializable contents of an [`InMemoryLedger`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub accounts: BTreeMap<AccountId, AccountRecord>,
}

/// One account: its sequence, data entries and history in confirmation order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub sequence: u64,
    #[serde(default)]
    pub data: BTreeMap<String, Vec<u8>>,
    #[serde(default)]
    pub transactions: Vec<LedgerTransaction>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::from_snapshot(LedgerSnapshot::default())
    }

    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
            offline: AtomicBool::new(false),
        }
    }

    /// Copy of the full ledger state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.state.read().expect("lock poisoned").clone()
    }

    /// Create an account with sequence 0. No-op if it already exists.
    pub fn fund(&self, account: &AccountId) {
        let mut state = self.state.write().expect("lock poisoned");
        state.accounts.entry(account.clone()).or_default();
    }

    /// Append an already-confirmed transaction to an account's history as-is.
    ///
    /// Bypasses every submission check; used to replay external history such
    /// as legacy anchors or unrelated traffic.
    pub fn insert_transaction(&self, account: &AccountId, tx: LedgerTransaction) {
        let mut state = self.state.write().expect("lock poisoned");
        state
            .accounts
            .entry(account.clone())
            .or_default()
            .transactions
            .push(tx);
    }

    /// Number of transactions recorded for an account.
    pub fn transaction_count(&self, account: &AccountId) -> usize {
        let state = self.state.read().expect("lock poisoned");
        state
            .accounts
            .get(account)
            .map_or(0, |record| record.transactions.len())
    }

    /// Current value of an account data entry.
    pub fn data_entry(&self, account: &AccountId, name: &str) -> Option<Vec<u8>> {
        let state = self.state.read().expect("lock poisoned");
        state.accounts.get(account)?.data.get(name).cloned()
    }

    /// Make every call fail with a transport error until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    fn ensure_online(&self) -> LedgerResult<()> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(LedgerError::Transport("ledger is offline".into()));
        }
        Ok(())
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().expect("lock poisoned");
        f.debug_struct("InMemoryLedger")
            .field("account_count", &state.accounts.len())
            .finish()
    }
}

#[async_trait]
impl LedgerService for InMemoryLedger {
    async fn list_transactions(
        &self,
        account: &AccountId,
        query: &TransactionQuery,
    ) -> LedgerResult<TransactionPage> {
        self.ensure_online()?;
        let after = query
            .cursor
            .as_deref()
            .map(|c| {
                c.parse::<usize>()
                    .map_err(|_| LedgerError::InvalidCursor(c.to_string()))
            })
            .transpose()?;

        let state = self.state.read().expect("lock poisoned");
        let Some(record) = state.accounts.get(account) else {
            return Ok(TransactionPage::default());
        };

        let len = record.transactions.len();
        let positions: Vec<usize> = match query.order {
            Order::Asc => (0..len).filter(|i| after.map_or(true, |c| *i > c)).collect(),
            Order::Desc => (0..len)
                .rev()
                .filter(|i| after.map_or(true, |c| *i < c))
                .collect(),
        };

        let limit = query.limit.clamp(1, MAX_PAGE_LIMIT) as usize;
        let page: Vec<usize> = positions.iter().take(limit).copied().collect();
        let next_cursor = if positions.len() > page.len() {
            page.last().map(|i| i.to_string())
        } else {
            None
        };

        Ok(TransactionPage {
            records: page
                .into_iter()
                .map(|i| record.transactions[i].clone())
                .collect(),
            next_cursor,
        })
    }

    async fn load_account(&self, account: &AccountId) -> LedgerResult<AccountState> {
        self.ensure_online()?;
        let state = self.state.read().expect("lock poisoned");
        let record = state
            .accounts
            .get(account)
            .ok_or_else(|| LedgerError::AccountNotFound(account.clone()))?;
        Ok(AccountState {
            account: account.clone(),
            sequence: record.sequence,
        })
    }

    async fn submit_transaction(&self, tx: &SignedTransaction) -> LedgerResult<SubmitReceipt> {
        self.ensure_online()?;
        verify_transaction(tx)?;

        let envelope = &tx.envelope;
        let signing_bytes = envelope.signing_bytes()?;

        let mut state = self.state.write().expect("lock poisoned");
        let record = state
            .accounts
            .get_mut(&envelope.source_account)
            .ok_or_else(|| LedgerError::AccountNotFound(envelope.source_account.clone()))?;

        let expected = record.sequence + 1;
        if envelope.sequence != expected {
            return Err(LedgerError::BadSequence {
                account: envelope.source_account.clone(),
                expected,
                actual: envelope.sequence,
            });
        }

        let mut operations = Vec::with_capacity(envelope.operations.len());
        for op in &envelope.operations {
            let kind = match (&op.value, record.data.contains_key(&op.name)) {
                (None, _) => ChangeKind::Removed,
                (Some(_), true) => ChangeKind::Updated,
                (Some(_), false) => ChangeKind::Created,
            };
            match &op.value {
                Some(value) => record.data.insert(op.name.clone(), value.clone()),
                None => record.data.remove(&op.name),
            };
            operations.push(OperationMeta {
                changes: vec![EntryChange {
                    kind,
                    entry: LedgerEntry::Data(DataEntry {
                        account_id: envelope.source_account.clone(),
                        name: op.name.clone(),
                        value: op.value.clone(),
                    }),
                }],
            });
        }
        let result_meta = TransactionMeta { operations }.encode()?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(&signing_bytes);
        hasher.update(&tx.signature);
        let id = AnchorId::from_trusted(hasher.finalize().to_hex().to_string());
        let created_at = next_close_time(record.transactions.last().map(|t| t.created_at));

        record.sequence = envelope.sequence;
        record.transactions.push(LedgerTransaction {
            id: id.clone(),
            source_account: envelope.source_account.clone(),
            created_at,
            memo: envelope.memo.clone(),
            result_meta,
        });

        Ok(SubmitReceipt { id, created_at })
    }
}

/// Close times are strictly increasing per account, even within one clock tick.
fn next_close_time(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + Duration::milliseconds(1),
        _ => now,
    }
}
