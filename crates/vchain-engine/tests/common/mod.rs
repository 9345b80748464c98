#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;
use vchain_codec::{address_to_anchor_payload, encode_block};
use vchain_engine::{BlockBuilder, ChainAssembler, EngineConfig};
use vchain_intake::InMemoryOperationQueue;
use vchain_ledger::{
    InMemoryLedger, LedgerService, ManageData, SigningCredential, SubmitReceipt,
    TransactionEnvelope,
};
use vchain_store::{ContentStore, InMemoryContentStore};
use vchain_types::{
    AccountId, Block, ContentAddress, Operation, OperationData, SchemaVersion, TrustData, UserId,
};

/// One funded chain account over in-memory backends.
pub struct Harness {
    pub ledger: Arc<InMemoryLedger>,
    pub store: Arc<InMemoryContentStore>,
    pub queue: Arc<InMemoryOperationQueue>,
    pub credential: SigningCredential,
    pub account: AccountId,
    pub config: EngineConfig,
}

impl Harness {
    pub fn new() -> Self {
        let credential = SigningCredential::generate();
        let account = credential.account_id();
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.fund(&account);

        let mut config = EngineConfig::for_account(account.clone());
        config.genesis_members = vec![uid("alice"), uid("bob")];

        Self {
            ledger,
            store: Arc::new(InMemoryContentStore::new()),
            queue: Arc::new(InMemoryOperationQueue::new()),
            credential,
            account,
            config,
        }
    }

    pub fn assembler(&self) -> ChainAssembler {
        ChainAssembler::new(self.ledger.clone(), self.store.clone(), self.config.clone()).unwrap()
    }

    pub fn builder(&self) -> BlockBuilder {
        BlockBuilder::new(
            self.ledger.clone(),
            self.store.clone(),
            self.queue.clone(),
            self.config.clone(),
        )
        .unwrap()
    }

    /// Store the canonical encoding of `block`.
    pub async fn publish(&self, block: &Block) -> ContentAddress {
        let bytes = encode_block(block).unwrap();
        self.store.put(Bytes::from(bytes)).await.unwrap()
    }

    pub async fn anchor(&self, address: &ContentAddress) -> SubmitReceipt {
        anchor_with(self.ledger.as_ref(), &self.credential, address).await
    }

    /// Publish and anchor `block`, bypassing the builder.
    pub async fn commit(&self, block: &Block) -> ContentAddress {
        let address = self.publish(block).await;
        self.anchor(&address).await;
        address
    }

    /// Publish and anchor a linked run of empty blocks `0..count`.
    pub async fn commit_linked(&self, count: u64) -> Vec<ContentAddress> {
        let mut addresses: Vec<ContentAddress> = Vec::new();
        for sequence in 0..count {
            let block = Block::new(sequence, SchemaVersion::V1, addresses.last().cloned(), vec![]);
            addresses.push(self.commit(&block).await);
        }
        addresses
    }
}

/// Submit an anchor transaction for `address` the way the builder does.
pub async fn anchor_with(
    ledger: &dyn LedgerService,
    credential: &SigningCredential,
    address: &ContentAddress,
) -> SubmitReceipt {
    let account = credential.account_id();
    let state = ledger.load_account(&account).await.unwrap();
    let payload = address_to_anchor_payload(address).unwrap();
    let envelope = TransactionEnvelope {
        source_account: account,
        sequence: state.sequence + 1,
        operations: vec![ManageData {
            name: "block-latest".into(),
            value: Some(address.as_str().as_bytes().to_vec()),
        }],
        memo: Some(payload.as_bytes().to_vec()),
    };
    let signed = credential.sign_envelope(envelope).unwrap();
    ledger.submit_transaction(&signed).await.unwrap()
}

pub fn uid(name: &str) -> UserId {
    UserId::new(name).unwrap()
}

pub fn trust(sequence: u64, creator: &str, to: &str) -> Operation {
    Operation::new(
        sequence,
        uid(creator),
        OperationData::Trust(TrustData { to_uid: uid(to) }),
    )
}
