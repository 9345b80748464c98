use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};
use vchain_ledger::{AnchorReader, LedgerService};
use vchain_store::{ContentResolver, ContentStore, ResolveError, Resolved};
use vchain_types::{AccountId, AnchorRecord, ContentAddress, SchemaVersion, VirtualBlock};

use crate::config::{EngineConfig, FanoutPolicy};
use crate::continuity::{ContinuityChecker, Violation};
use crate::error::{EngineError, EngineResult};

/// An anchor whose content could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolutionFailure {
    pub anchor: AnchorRecord,
    pub error: ResolveError,
}

/// Missing positions tolerated because some anchors failed to resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SequenceGap {
    pub after: u64,
    pub next: u64,
}

/// An assembled chain, ascending by block sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssembledChain {
    pub blocks: Vec<VirtualBlock>,
    /// Always empty under [`FanoutPolicy::FailFast`].
    pub failures: Vec<ResolutionFailure>,
    pub gaps: Vec<SequenceGap>,
    /// Anchored blocks of other schema versions, left out of `blocks`.
    pub foreign_blocks: usize,
    /// Highest operation sequence among the foreign blocks.
    pub foreign_max_operation_sequence: Option<u64>,
    /// The anchor scan stopped at `max_pages`; `blocks` is the recent tail
    /// and need not start at genesis.
    pub truncated: bool,
}

impl AssembledChain {
    /// The last block, if any.
    pub fn head(&self) -> Option<&VirtualBlock> {
        self.blocks.last()
    }

    pub fn head_address(&self) -> Option<&ContentAddress> {
        self.head().map(VirtualBlock::address)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Every anchor resolved.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fail with the first resolution failure, if any.
    pub fn require_complete(&self) -> EngineResult<()> {
        match self.failures.first() {
            Some(failure) => Err(failure.error.clone().into()),
            None => Ok(()),
        }
    }

    /// Highest operation sequence anywhere in the chain, blocks of other
    /// schema versions included.
    pub fn max_operation_sequence(&self) -> Option<u64> {
        self.blocks
            .iter()
            .filter_map(|vb| vb.data.max_operation_sequence())
            .max()
            .max(self.foreign_max_operation_sequence)
    }

    pub fn into_blocks(self) -> Vec<VirtualBlock> {
        self.blocks
    }
}

/// Builds the ordered, version-filtered view of the chain from ledger
/// anchors and content-store bodies.
///
/// Holds no state between calls; every assembly re-reads both systems.
#[derive(Clone)]
pub struct ChainAssembler {
    anchors: AnchorReader,
    resolver: ContentResolver,
    config: EngineConfig,
}

impl ChainAssembler {
    pub fn new(
        ledger: Arc<dyn LedgerService>,
        store: Arc<dyn ContentStore>,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        config.validate()?;
        let anchors = AnchorReader::new(ledger)
            .with_name_prefix(config.anchor_name_prefix.clone())
            .with_page_limit(config.page_limit)
            .with_max_pages(config.max_pages);
        Ok(Self {
            anchors,
            resolver: ContentResolver::new(store),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn supported_version(&self) -> SchemaVersion {
        self.config.supported_version
    }

    /// The same assembler without a page cap on the anchor scan.
    pub fn unbounded(&self) -> Self {
        let mut config = self.config.clone();
        config.max_pages = None;
        Self {
            anchors: self.anchors.clone().with_max_pages(None),
            resolver: self.resolver.clone(),
            config,
        }
    }

    /// Recognized anchors of `account`, most recent first.
    pub async fn list_anchors(&self, account: &AccountId) -> EngineResult<Vec<AnchorRecord>> {
        Ok(self.anchors.list_anchors(account).await?)
    }

    /// Assemble the chain of `account`.
    ///
    /// Anchors are resolved concurrently, blocks of other schema versions are
    /// dropped, and the rest is sorted by block sequence and checked for hash
    /// continuity. A broken link is always an error; what a resolution
    /// failure does depends on the configured [`FanoutPolicy`]. A chain
    /// without its genesis block is accepted only when the scan was capped
    /// or some anchors failed to resolve.
    pub async fn assemble(&self, account: &AccountId) -> EngineResult<AssembledChain> {
        let listing = self.anchors.scan(account).await?;
        let anchors = dedupe_anchors(listing.anchors);
        let anchor_count = anchors.len();

        let (resolved, failures) = match self.config.fanout_policy {
            FanoutPolicy::FailFast => (self.resolve_all(anchors).await?, Vec::new()),
            FanoutPolicy::Partial => self.resolve_partial(anchors).await,
        };

        let mut chain = AssembledChain {
            failures,
            truncated: listing.truncated,
            ..Default::default()
        };
        for (anchor, outcome) in resolved {
            match outcome {
                Resolved::Current(block) => chain.blocks.push(VirtualBlock::new(anchor, block)),
                Resolved::Foreign {
                    version,
                    max_operation_sequence,
                } => {
                    debug!(address = %anchor.content_address.short(), %version, "filtered foreign-version block");
                    chain.foreign_blocks += 1;
                    chain.foreign_max_operation_sequence = chain
                        .foreign_max_operation_sequence
                        .max(max_operation_sequence);
                }
            }
        }

        // Ledger order says nothing about logical order.
        chain.blocks.sort_by(|a, b| {
            a.sequence()
                .cmp(&b.sequence())
                .then_with(|| a.metadata.observed_at.cmp(&b.metadata.observed_at))
        });

        for violation in ContinuityChecker::check(&chain.blocks) {
            match violation {
                Violation::SequenceGap { after, next, .. } if !chain.failures.is_empty() => {
                    warn!(after, next, "sequence gap left by unresolved anchors");
                    chain.gaps.push(SequenceGap { after, next });
                }
                Violation::MissingGenesis { sequence, .. }
                    if chain.truncated || !chain.failures.is_empty() =>
                {
                    debug!(first = sequence, truncated = chain.truncated, "chain read without its genesis block");
                }
                violation => return Err(violation.into()),
            }
        }

        info!(
            %account,
            anchors = anchor_count,
            blocks = chain.blocks.len(),
            foreign = chain.foreign_blocks,
            failures = chain.failures.len(),
            truncated = chain.truncated,
            "assembled chain"
        );
        Ok(chain)
    }

    /// Content address of the current chain head.
    pub async fn head(&self, account: &AccountId) -> EngineResult<Option<ContentAddress>> {
        let chain = self.assemble(account).await?;
        chain.require_complete()?;
        Ok(chain.head_address().cloned())
    }

    async fn resolve_all(
        &self,
        anchors: Vec<AnchorRecord>,
    ) -> EngineResult<Vec<(AnchorRecord, Resolved)>> {
        stream::iter(anchors)
            .map(|anchor| async move {
                let resolved = self.resolve_one(&anchor.content_address).await?;
                Ok::<_, EngineError>((anchor, resolved))
            })
            .buffer_unordered(self.config.fanout_concurrency)
            .try_collect()
            .await
    }

    async fn resolve_partial(
        &self,
        anchors: Vec<AnchorRecord>,
    ) -> (Vec<(AnchorRecord, Resolved)>, Vec<ResolutionFailure>) {
        let outcomes: Vec<(AnchorRecord, Result<Resolved, ResolveError>)> = stream::iter(anchors)
            .map(|anchor| async move {
                let outcome = self.resolve_one(&anchor.content_address).await;
                (anchor, outcome)
            })
            .buffer_unordered(self.config.fanout_concurrency)
            .collect()
            .await;

        let mut resolved = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (anchor, outcome) in outcomes {
            match outcome {
                Ok(r) => resolved.push((anchor, r)),
                Err(error) => {
                    warn!(address = %anchor.content_address.short(), %error, "anchor left unresolved");
                    failures.push(ResolutionFailure { anchor, error });
                }
            }
        }
        (resolved, failures)
    }

    async fn resolve_one(&self, address: &ContentAddress) -> Result<Resolved, ResolveError> {
        let supported = self.config.supported_version;
        let Some(limit) = self.config.resolve_timeout() else {
            return self.resolver.resolve_versioned(address, supported).await;
        };
        match tokio::time::timeout(limit, self.resolver.resolve_versioned(address, supported)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(ResolveError::ContentUnavailable {
                address: address.clone(),
                reason: format!("timed out after {} ms", limit.as_millis()),
            }),
        }
    }
}

impl std::fmt::Debug for ChainAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainAssembler")
            .field("anchors", &self.anchors)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Collapse anchors of the same content address to the earliest confirmed one.
///
/// Input and output are most recent first.
fn dedupe_anchors(anchors: Vec<AnchorRecord>) -> Vec<AnchorRecord> {
    let total = anchors.len();
    let mut earliest: HashMap<ContentAddress, (usize, AnchorRecord)> = HashMap::new();

    // Oldest first, so ties keep the anchor that came first on the ledger.
    for (age, anchor) in anchors.into_iter().rev().enumerate() {
        match earliest.get(&anchor.content_address) {
            Some((_, kept)) if !confirmed_before(&anchor, kept) => {
                debug!(address = %anchor.content_address.short(), anchor = %anchor.anchor_id, "ignoring duplicate anchor");
            }
            _ => {
                earliest.insert(anchor.content_address.clone(), (age, anchor));
            }
        }
    }

    let mut kept: Vec<(usize, AnchorRecord)> = earliest.into_values().collect();
    kept.sort_by(|a, b| b.0.cmp(&a.0));
    if kept.len() < total {
        debug!(total, kept = kept.len(), "collapsed duplicate anchors");
    }
    kept.into_iter().map(|(_, anchor)| anchor).collect()
}

fn confirmed_before(a: &AnchorRecord, b: &AnchorRecord) -> bool {
    match (a.observed_at, b.observed_at) {
        (Some(a), Some(b)) => a < b,
        (Some(_), None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use vchain_types::AnchorId;

    use super::*;

    fn anchor(id: &str, tag: &str, minute: Option<u32>) -> AnchorRecord {
        AnchorRecord {
            content_address: vchain_codec::compute_content_address(tag.as_bytes()),
            anchor_id: AnchorId::new(id).unwrap(),
            observed_at: minute.map(|m| Utc.with_ymd_and_hms(2019, 1, 1, 0, m, 0).unwrap()),
        }
    }

    fn ids(anchors: &[AnchorRecord]) -> Vec<&str> {
        anchors.iter().map(|a| a.anchor_id.as_str()).collect()
    }

    #[test]
    fn dedupe_keeps_earliest_confirmation() {
        // Most recent first, as the ledger lists them.
        let anchors = vec![
            anchor("t3", "b", Some(3)),
            anchor("t2", "a", Some(2)),
            anchor("t1", "a", Some(1)),
        ];
        assert_eq!(ids(&dedupe_anchors(anchors)), vec!["t3", "t1"]);
    }

    #[test]
    fn dedupe_ties_keep_ledger_order() {
        let anchors = vec![anchor("late", "a", None), anchor("early", "a", None)];
        assert_eq!(ids(&dedupe_anchors(anchors)), vec!["early"]);
    }

    #[test]
    fn dedupe_prefers_timestamped_anchor() {
        let anchors = vec![anchor("stamped", "a", Some(9)), anchor("bare", "a", None)];
        assert_eq!(ids(&dedupe_anchors(anchors)), vec!["stamped"]);
    }

    #[test]
    fn dedupe_preserves_distinct_anchors() {
        let anchors = vec![anchor("t2", "b", Some(2)), anchor("t1", "a", Some(1))];
        assert_eq!(ids(&dedupe_anchors(anchors)), vec!["t2", "t1"]);
        assert!(dedupe_anchors(vec![]).is_empty());
    }
}
