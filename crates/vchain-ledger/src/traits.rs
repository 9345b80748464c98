use async_trait::async_trait;
use vchain_types::AccountId;

use crate::error::LedgerResult;
use crate::records::{
    AccountState, SignedTransaction, SubmitReceipt, TransactionPage, TransactionQuery,
};

/// Boundary to the public transaction ledger that holds chain anchors.
///
/// Confirmed transactions are immutable; nothing here edits or deletes one.
#[async_trait]
pub trait LedgerService: Send + Sync {
    /// One page of the transactions an account took part in.
    ///
    /// An account with no history yields an empty page.
    async fn list_transactions(
        &self,
        account: &AccountId,
        query: &TransactionQuery,
    ) -> LedgerResult<TransactionPage>;

    async fn load_account(&self, account: &AccountId) -> LedgerResult<AccountState>;

    /// Submit a signed envelope. Accepted only when its sequence is the
    /// source account's next sequence and the signature verifies.
    async fn submit_transaction(&self, tx: &SignedTransaction) -> LedgerResult<SubmitReceipt>;
}
