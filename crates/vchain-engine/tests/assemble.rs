mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use common::{trust, Harness};
use vchain_codec::compute_content_address;
use vchain_engine::{EngineError, FanoutPolicy, SequenceGap};
use vchain_ledger::{
    AnchorError, ChangeKind, DataEntry, EntryChange, LedgerEntry, LedgerTransaction,
    OperationMeta, TransactionMeta,
};
use vchain_store::{ContentStore, InMemoryContentStore, ResolveError, StoreResult};
use vchain_types::{AnchorId, Block, ContentAddress, SchemaVersion};

#[tokio::test]
async fn empty_account_is_an_empty_chain() {
    let h = Harness::new();
    let chain = h.assembler().assemble(&h.account).await.unwrap();
    assert!(chain.is_empty());
    assert!(chain.is_complete());
    assert_eq!(chain.head(), None);
    assert_eq!(h.assembler().head(&h.account).await.unwrap(), None);
}

#[tokio::test]
async fn single_genesis_block() {
    let h = Harness::new();
    let genesis = Block::new(0, SchemaVersion::V1, None, vec![trust(0, "alice", "bob")]);
    let address = h.commit(&genesis).await;

    let chain = h.assembler().assemble(&h.account).await.unwrap();
    assert_eq!(chain.len(), 1);
    let head = chain.head().unwrap();
    assert_eq!(head.address(), &address);
    assert_eq!(head.data, genesis);
    assert!(head.metadata.observed_at.is_some());
    assert_eq!(chain.max_operation_sequence(), Some(0));
}

#[tokio::test]
async fn anchors_confirmed_out_of_order_are_sorted() {
    let h = Harness::new();
    let b0 = Block::new(0, SchemaVersion::V1, None, vec![]);
    let a0 = h.publish(&b0).await;
    let b1 = Block::new(1, SchemaVersion::V1, Some(a0.clone()), vec![]);
    let a1 = h.publish(&b1).await;
    let b2 = Block::new(2, SchemaVersion::V1, Some(a1.clone()), vec![]);
    let a2 = h.publish(&b2).await;

    for address in [&a2, &a0, &a1] {
        h.anchor(address).await;
    }

    let chain = h.assembler().assemble(&h.account).await.unwrap();
    let order: Vec<&ContentAddress> = chain.blocks.iter().map(|vb| vb.address()).collect();
    assert_eq!(order, vec![&a0, &a1, &a2]);
}

#[tokio::test]
async fn foreign_versions_are_filtered() {
    let h = Harness::new();
    let addresses = h.commit_linked(2).await;

    // An older body shape that the current schema cannot decode.
    let legacy = Bytes::from_static(br#"{"version":0,"seq":7,"ops":"opaque"}"#);
    let legacy_address = h.store.put(legacy).await.unwrap();
    h.anchor(&legacy_address).await;

    let mut newer = Block::new(0, SchemaVersion(2), None, vec![]);
    newer.prev_version_hash = Some(addresses[0].clone());
    h.commit(&newer).await;

    let chain = h.assembler().assemble(&h.account).await.unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain.foreign_blocks, 2);
    assert!(chain.blocks.iter().all(|vb| vb.data.version == SchemaVersion::V1));
}

#[tokio::test]
async fn reader_for_another_version_sees_its_own_sub_chain() {
    let mut h = Harness::new();
    h.commit_linked(3).await;
    let v2 = Block::new(0, SchemaVersion(2), None, vec![]);
    let v2_address = h.commit(&v2).await;

    h.config.supported_version = SchemaVersion(2);
    let chain = h.assembler().assemble(&h.account).await.unwrap();
    assert_eq!(chain.len(), 1);
    assert_eq!(chain.head_address(), Some(&v2_address));
    assert_eq!(chain.foreign_blocks, 3);
}

#[tokio::test]
async fn broken_link_is_a_discontinuity() {
    let h = Harness::new();
    h.commit(&Block::new(0, SchemaVersion::V1, None, vec![])).await;
    let stray = compute_content_address(b"not the genesis block");
    let bad = h
        .commit(&Block::new(1, SchemaVersion::V1, Some(stray), vec![]))
        .await;

    let err = h.assembler().assemble(&h.account).await.unwrap_err();
    match err {
        EngineError::ChainDiscontinuity {
            sequence, address, ..
        } => {
            assert_eq!(sequence, 1);
            assert_eq!(address, bad);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn competing_blocks_at_one_sequence_are_a_discontinuity() {
    let h = Harness::new();
    let genesis = h.commit_linked(1).await.remove(0);
    let ours = Block::new(1, SchemaVersion::V1, Some(genesis.clone()), vec![trust(0, "alice", "bob")]);
    let theirs = Block::new(1, SchemaVersion::V1, Some(genesis), vec![trust(0, "bob", "alice")]);
    h.commit(&ours).await;
    h.commit(&theirs).await;

    let err = h.assembler().assemble(&h.account).await.unwrap_err();
    assert!(matches!(err, EngineError::ChainDiscontinuity { sequence: 1, .. }));
    assert!(err.to_string().contains("sequence already taken"));
}

#[tokio::test]
async fn duplicate_anchor_of_one_block_collapses() {
    let h = Harness::new();
    let addresses = h.commit_linked(2).await;
    let first = h.assembler().assemble(&h.account).await.unwrap();

    // Re-anchoring the same content, e.g. a retried build.
    h.anchor(&addresses[1]).await;

    let chain = h.assembler().assemble(&h.account).await.unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(
        chain.blocks[1].metadata.anchor_id,
        first.blocks[1].metadata.anchor_id
    );
}

#[tokio::test]
async fn missing_content_fails_fast_by_default() {
    let h = Harness::new();
    let addresses = h.commit_linked(3).await;
    h.store.remove(&addresses[1]);

    let err = h.assembler().assemble(&h.account).await.unwrap_err();
    match &err {
        EngineError::Resolve(ResolveError::ContentUnavailable { address, .. }) => {
            assert_eq!(address, &addresses[1]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn partial_policy_reports_failures_and_gaps() {
    let mut h = Harness::new();
    h.config.fanout_policy = FanoutPolicy::Partial;
    let addresses = h.commit_linked(3).await;
    h.store.remove(&addresses[1]);

    let chain = h.assembler().assemble(&h.account).await.unwrap();
    assert_eq!(chain.len(), 2);
    assert!(!chain.is_complete());
    assert_eq!(chain.failures.len(), 1);
    assert_eq!(chain.failures[0].anchor.content_address, addresses[1]);
    assert_eq!(chain.gaps, vec![SequenceGap { after: 0, next: 2 }]);
    assert!(matches!(chain.require_complete(), Err(EngineError::Resolve(_))));
    assert!(h.assembler().head(&h.account).await.is_err());
}

#[tokio::test]
async fn partial_policy_still_rejects_broken_links() {
    let mut h = Harness::new();
    h.config.fanout_policy = FanoutPolicy::Partial;
    let addresses = h.commit_linked(2).await;
    h.store.remove(&addresses[0]);
    let stray = compute_content_address(b"elsewhere");
    h.commit(&Block::new(2, SchemaVersion::V1, Some(stray), vec![]))
        .await;

    let err = h.assembler().assemble(&h.account).await.unwrap_err();
    assert!(matches!(err, EngineError::ChainDiscontinuity { sequence: 2, .. }));
}

#[tokio::test]
async fn full_scan_without_genesis_is_a_discontinuity() {
    for policy in [FanoutPolicy::FailFast, FanoutPolicy::Partial] {
        let mut h = Harness::new();
        h.config.fanout_policy = policy;
        let unanchored = compute_content_address(b"never anchored");
        let orphan = h
            .commit(&Block::new(3, SchemaVersion::V1, Some(unanchored), vec![]))
            .await;

        let err = h.assembler().assemble(&h.account).await.unwrap_err();
        match err {
            EngineError::ChainDiscontinuity {
                sequence, address, ..
            } => {
                assert_eq!(sequence, 3);
                assert_eq!(address, orphan);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(h.builder().prepare().await.is_err());
    }
}

#[tokio::test]
async fn unresolved_genesis_is_reported_not_rejected() {
    let mut h = Harness::new();
    h.config.fanout_policy = FanoutPolicy::Partial;
    let addresses = h.commit_linked(3).await;
    h.store.remove(&addresses[0]);

    let chain = h.assembler().assemble(&h.account).await.unwrap();
    let sequences: Vec<u64> = chain.blocks.iter().map(|vb| vb.sequence()).collect();
    assert_eq!(sequences, vec![1, 2]);
    assert_eq!(chain.failures.len(), 1);
    assert!(!chain.truncated);
    assert!(chain.require_complete().is_err());
}

#[tokio::test]
async fn gap_without_failures_is_a_discontinuity() {
    let mut h = Harness::new();
    h.config.fanout_policy = FanoutPolicy::Partial;
    h.commit_linked(1).await;
    // Block 1 was never anchored.
    let missing = compute_content_address(b"block one");
    h.commit(&Block::new(2, SchemaVersion::V1, Some(missing), vec![]))
        .await;

    let err = h.assembler().assemble(&h.account).await.unwrap_err();
    assert!(err.to_string().contains("gap"));
}

#[tokio::test]
async fn tampered_content_is_rejected() {
    let h = Harness::new();
    let addresses = h.commit_linked(1).await;
    h.store.insert_raw(addresses[0].clone(), b"{}".to_vec());

    let err = h.assembler().assemble(&h.account).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Resolve(ResolveError::ContentMismatch { .. })
    ));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn corrupt_anchor_metadata_aborts_the_read() {
    let h = Harness::new();
    h.commit_linked(1).await;
    let meta = TransactionMeta {
        operations: vec![OperationMeta {
            changes: vec![EntryChange {
                kind: ChangeKind::Created,
                entry: LedgerEntry::Data(DataEntry {
                    account_id: h.account.clone(),
                    name: "block-latest".into(),
                    value: Some(b"not an address".to_vec()),
                }),
            }],
        }],
    };
    h.ledger.insert_transaction(
        &h.account,
        LedgerTransaction {
            id: AnchorId::new("corrupt").unwrap(),
            source_account: h.account.clone(),
            created_at: Utc::now(),
            memo: None,
            result_meta: meta.encode().unwrap(),
        },
    );

    let err = h.assembler().assemble(&h.account).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Anchor(AnchorError::CorruptAnchorMetadata { .. })
    ));
}

#[tokio::test]
async fn history_longer_than_a_page_is_read_in_full() {
    let mut h = Harness::new();
    h.config.page_limit = 2;
    h.commit_linked(5).await;

    let chain = h.assembler().assemble(&h.account).await.unwrap();
    assert_eq!(chain.len(), 5);
    assert_eq!(chain.head().unwrap().sequence(), 4);
    assert!(!chain.truncated);
}

#[tokio::test]
async fn page_cap_yields_the_recent_tail() {
    let mut h = Harness::new();
    h.config.page_limit = 2;
    h.config.max_pages = Some(1);
    h.commit_linked(5).await;

    let chain = h.assembler().assemble(&h.account).await.unwrap();
    let sequences: Vec<u64> = chain.blocks.iter().map(|vb| vb.sequence()).collect();
    assert_eq!(sequences, vec![3, 4]);
    assert!(chain.truncated);
    assert!(chain.is_complete());

    let full = h.assembler().unbounded().assemble(&h.account).await.unwrap();
    assert_eq!(full.len(), 5);
    assert!(!full.truncated);
}

/// A store whose reads never finish in time.
struct StalledStore {
    inner: InMemoryContentStore,
}

#[async_trait]
impl ContentStore for StalledStore {
    async fn put(&self, bytes: Bytes) -> StoreResult<ContentAddress> {
        self.inner.put(bytes).await
    }

    async fn get(&self, address: &ContentAddress) -> StoreResult<Option<Bytes>> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        self.inner.get(address).await
    }
}

#[tokio::test]
async fn stalled_resolution_counts_as_unavailable() {
    let mut h = Harness::new();
    h.config.fanout_policy = FanoutPolicy::Partial;
    h.config.resolve_timeout_ms = Some(20);
    h.commit_linked(2).await;

    let stalled = Arc::new(StalledStore {
        inner: InMemoryContentStore::from_snapshot(h.store.snapshot()).unwrap(),
    });
    let assembler =
        vchain_engine::ChainAssembler::new(h.ledger.clone(), stalled, h.config.clone()).unwrap();

    let chain = assembler.assemble(&h.account).await.unwrap();
    assert!(chain.is_empty());
    assert_eq!(chain.failures.len(), 2);
    assert!(chain.failures.iter().all(|f| matches!(
        &f.error,
        ResolveError::ContentUnavailable { reason, .. } if reason.contains("timed out")
    )));
}
