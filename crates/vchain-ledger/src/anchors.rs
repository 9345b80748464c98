use std::sync::Arc;

use tracing::{debug, info, warn};
use vchain_codec::{address_to_anchor_payload, anchor_payload_to_address, AnchorPayload};
use vchain_types::{AccountId, AnchorRecord, ContentAddress};

use crate::error::AnchorError;
use crate::records::{LedgerTransaction, TransactionQuery, MAX_PAGE_LIMIT};
use crate::traits::LedgerService;

/// Default prefix of the data-entry name that marks a chain anchor.
pub const DEFAULT_ANCHOR_PREFIX: &str = "block-";

/// Anchors found by one scan of an account's history.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnchorListing {
    /// Most recent first.
    pub anchors: Vec<AnchorRecord>,
    /// The scan stopped at the page cap with older history left unread.
    pub truncated: bool,
}

/// Recognizes chain anchors in an account's ledger history.
///
/// Performs no ordering or continuity checks; it only finds anchors and
/// extracts their content addresses.
#[derive(Clone)]
pub struct AnchorReader {
    ledger: Arc<dyn LedgerService>,
    name_prefix: String,
    page_limit: u32,
    max_pages: Option<u32>,
}

impl AnchorReader {
    pub fn new(ledger: Arc<dyn LedgerService>) -> Self {
        Self {
            ledger,
            name_prefix: DEFAULT_ANCHOR_PREFIX.to_string(),
            page_limit: MAX_PAGE_LIMIT,
            max_pages: None,
        }
    }

    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = limit;
        self
    }

    /// Stop after this many pages. `None` reads the full history.
    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// All anchors of `account`, most recent first as the ledger returns them.
    pub async fn list_anchors(&self, account: &AccountId) -> Result<Vec<AnchorRecord>, AnchorError> {
        Ok(self.scan(account).await?.anchors)
    }

    /// Like [`list_anchors`](Self::list_anchors), also reporting whether
    /// `max_pages` cut the scan short.
    pub async fn scan(&self, account: &AccountId) -> Result<AnchorListing, AnchorError> {
        let mut listing = AnchorListing::default();
        let mut query = TransactionQuery::latest().with_limit(self.page_limit);
        let mut pages = 0u32;
        let mut scanned = 0usize;

        loop {
            let page = self.ledger.list_transactions(account, &query).await?;
            pages += 1;
            scanned += page.records.len();

            for tx in &page.records {
                if let Some(anchor) = self.parse_anchor(account, tx)? {
                    listing.anchors.push(anchor);
                }
            }

            match page.next_cursor {
                Some(cursor) if self.max_pages.map_or(true, |max| pages < max) => {
                    query = query.with_cursor(Some(cursor));
                }
                Some(_) => {
                    warn!(%account, pages, "anchor listing stopped at page limit");
                    listing.truncated = true;
                    break;
                }
                None => break,
            }
        }

        info!(
            %account,
            scanned,
            anchors = listing.anchors.len(),
            truncated = listing.truncated,
            "listed chain anchors"
        );
        Ok(listing)
    }

    /// Recognize one transaction.
    ///
    /// Returns `Ok(None)` for traffic that is not a chain anchor, and
    /// [`AnchorError::CorruptAnchorMetadata`] for a transaction that carries
    /// the anchor name but no usable content address.
    pub fn parse_anchor(
        &self,
        account: &AccountId,
        tx: &LedgerTransaction,
    ) -> Result<Option<AnchorRecord>, AnchorError> {
        if tx.source_account != *account {
            debug!(tx = %tx.id, source = %tx.source_account, "skipping foreign transaction");
            return Ok(None);
        }

        let meta = match tx.meta() {
            Ok(meta) => meta,
            Err(e) => {
                // Without metadata there is no name, so this cannot be claimed as an anchor.
                warn!(tx = %tx.id, error = %e, "skipping transaction with unreadable metadata");
                return Ok(None);
            }
        };

        let Some(entry) = meta.first_data_entry() else {
            debug!(tx = %tx.id, "skipping transaction without data entry");
            return Ok(None);
        };
        if !entry.name.starts_with(&self.name_prefix) {
            debug!(tx = %tx.id, name = %entry.name, "skipping unrelated data entry");
            return Ok(None);
        }

        let corrupt = |reason: String| AnchorError::CorruptAnchorMetadata {
            anchor_id: tx.id.clone(),
            reason,
        };

        let content_address = match (&tx.memo, &entry.value) {
            (Some(memo), _) => {
                let payload = AnchorPayload::from_slice(memo)
                    .map_err(|e| corrupt(format!("memo: {e}")))?;
                anchor_payload_to_address(&payload)
            }
            (None, Some(value)) => legacy_address(value).map_err(corrupt)?,
            (None, None) => return Err(corrupt("no memo and no data value".into())),
        };

        debug!(tx = %tx.id, address = %content_address.short(), "recognized anchor");
        Ok(Some(AnchorRecord {
            content_address,
            anchor_id: tx.id.clone(),
            observed_at: Some(tx.created_at),
        }))
    }
}

impl std::fmt::Debug for AnchorReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnchorReader")
            .field("name_prefix", &self.name_prefix)
            .field("page_limit", &self.page_limit)
            .field("max_pages", &self.max_pages)
            .finish()
    }
}

/// Older anchors carry the textual address in the data entry value.
fn legacy_address(value: &[u8]) -> Result<ContentAddress, String> {
    let text = std::str::from_utf8(value).map_err(|e| format!("value is not utf-8: {e}"))?;
    let address = ContentAddress::parse(text.trim()).map_err(|e| format!("value: {e}"))?;
    address_to_anchor_payload(&address).map_err(|e| format!("value: {e}"))?;
    Ok(address)
}
