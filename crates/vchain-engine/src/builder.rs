use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};
use uuid::Uuid;
use vchain_codec::{address_to_anchor_payload, compute_content_address, encode_block};
use vchain_intake::{
    IntakeReport, MemberRegistry, OperationIntake, OperationQueue, OperationValidator,
};
use vchain_ledger::{LedgerService, ManageData, SigningCredential, TransactionEnvelope};
use vchain_store::{ContentStore, ResolveError};
use vchain_types::{AccountId, AnchorRecord, Block, ContentAddress, VirtualBlock};

use crate::assembler::ChainAssembler;
use crate::config::EngineConfig;
use crate::coordinator::{BuildCoordinator, Uncoordinated};
use crate::error::{EngineError, EngineResult};

/// A serialized next block that has not been published or anchored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedBlock {
    pub block: Block,
    /// Canonical encoding of `block`; `address` is computed over these bytes.
    pub bytes: Bytes,
    pub address: ContentAddress,
    /// Intake outcome; the accepted operations carry their final sequences.
    pub report: IntakeReport,
}

impl PreparedBlock {
    pub fn sequence(&self) -> u64 {
        self.block.sequence
    }

    /// Queue records that go into the block.
    pub fn queue_ids(&self) -> Vec<Uuid> {
        self.report.queue_ids()
    }

    /// `block-<sequence>-<address>.json`
    pub fn file_name(&self) -> String {
        format!("block-{}-{}.json", self.block.sequence, self.address)
    }
}

/// A block that is published and anchored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommittedBlock {
    pub virtual_block: VirtualBlock,
    pub report: IntakeReport,
}

impl CommittedBlock {
    /// Queue records the caller should now mark applied.
    pub fn queue_ids(&self) -> Vec<Uuid> {
        self.report.queue_ids()
    }
}

/// Produces the next block of a chain from queued operations.
pub struct BlockBuilder {
    account: AccountId,
    assembler: ChainAssembler,
    intake: OperationIntake,
    queue: Arc<dyn OperationQueue>,
    store: Arc<dyn ContentStore>,
    ledger: Arc<dyn LedgerService>,
    coordinator: Arc<dyn BuildCoordinator>,
    config: EngineConfig,
}

impl BlockBuilder {
    /// A builder for the chain of `config.account`, with the default rule
    /// pipeline and no coordination.
    pub fn new(
        ledger: Arc<dyn LedgerService>,
        store: Arc<dyn ContentStore>,
        queue: Arc<dyn OperationQueue>,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        let account = config.account()?.clone();
        let assembler = ChainAssembler::new(ledger.clone(), store.clone(), config.clone())?;
        Ok(Self {
            account,
            assembler,
            intake: OperationIntake::new(queue.clone()),
            queue,
            store,
            ledger,
            coordinator: Arc::new(Uncoordinated),
            config,
        })
    }

    pub fn with_coordinator(mut self, coordinator: Arc<dyn BuildCoordinator>) -> Self {
        self.coordinator = coordinator;
        self
    }

    /// Replace the default rule pipeline.
    pub fn with_validator(mut self, validator: OperationValidator) -> Self {
        self.intake = OperationIntake::with_validator(self.queue.clone(), validator);
        self
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn assembler(&self) -> &ChainAssembler {
        &self.assembler
    }

    /// Build the next block without publishing or anchoring it.
    ///
    /// Refuses to build on a partially resolved chain. A capped anchor scan
    /// is repeated in full, since operation sequences and members come from
    /// the whole history.
    pub async fn prepare(&self) -> EngineResult<PreparedBlock> {
        let (chain, batch) = tokio::try_join!(self.assembler.assemble(&self.account), async {
            self.intake
                .collect_pending_operations()
                .await
                .map_err(EngineError::from)
        })?;
        let chain = if chain.truncated {
            debug!(account = %self.account, "capped anchor scan, reading full history");
            self.assembler.unbounded().assemble(&self.account).await?
        } else {
            chain
        };
        chain.require_complete()?;

        let next_sequence = chain.head().map_or(0, |head| head.sequence() + 1);
        let prev_hash = chain.head_address().cloned();

        let members = MemberRegistry::from_chain(
            self.config.genesis_members.iter().cloned(),
            chain.blocks.iter().map(|vb| &vb.data),
        );
        let mut report = self.intake.validate(batch, members);

        // Operation sequences run on across blocks, independent of block sequence.
        let base = chain.max_operation_sequence().map_or(0, |max| max + 1);
        for (offset, pending) in report.accepted.iter_mut().enumerate() {
            pending.operation.sequence = base + offset as u64;
        }

        let block = Block::new(
            next_sequence,
            self.config.supported_version,
            prev_hash,
            report.operations(),
        );
        let bytes = Bytes::from(encode_block(&block)?);
        let address = compute_content_address(&bytes);

        debug!(
            sequence = next_sequence,
            address = %address.short(),
            operations = block.operations.len(),
            "prepared block"
        );
        Ok(PreparedBlock {
            block,
            bytes,
            address,
            report,
        })
    }

    /// Build, publish and anchor the next block.
    pub async fn build_and_commit(
        &self,
        credential: &SigningCredential,
    ) -> EngineResult<VirtualBlock> {
        let committed = self.build_and_commit_with_report(credential).await?;
        Ok(committed.virtual_block)
    }

    /// [`build_and_commit`](Self::build_and_commit), also returning the
    /// intake report so the caller can mark the included records applied.
    ///
    /// A failure after publishing leaves unanchored content in the store,
    /// which is harmless: the whole call can be repeated and publishes the
    /// same bytes under the same address.
    pub async fn build_and_commit_with_report(
        &self,
        credential: &SigningCredential,
    ) -> EngineResult<CommittedBlock> {
        let signer = credential.account_id();
        if signer != self.account {
            return Err(EngineError::CredentialMismatch {
                expected: self.account.clone(),
                actual: signer,
            });
        }

        let _guard = self.coordinator.acquire().await?;
        let prepared = self.prepare().await?;

        let stored = self.store.put(prepared.bytes.clone()).await?;
        if stored != prepared.address {
            return Err(ResolveError::ContentMismatch {
                address: prepared.address,
                computed: stored,
            }
            .into());
        }
        info!(
            sequence = prepared.sequence(),
            address = %prepared.address,
            operations = prepared.block.operations.len(),
            "published block"
        );

        if self.config.recheck_head_before_anchor {
            let head = self.assembler.head(&self.account).await?;
            if head != prepared.block.prev_hash {
                return Err(EngineError::HeadMoved {
                    expected: prepared.block.prev_hash,
                    found: head,
                });
            }
        }

        let account = self.ledger.load_account(&self.account).await?;
        let payload = address_to_anchor_payload(&prepared.address)?;
        let envelope = TransactionEnvelope {
            source_account: self.account.clone(),
            sequence: account.sequence + 1,
            operations: vec![ManageData {
                name: self.config.anchor_entry_name.clone(),
                value: Some(prepared.address.as_str().as_bytes().to_vec()),
            }],
            memo: Some(payload.as_bytes().to_vec()),
        };
        let signed = credential.sign_envelope(envelope)?;
        let receipt = self.ledger.submit_transaction(&signed).await?;
        info!(
            sequence = prepared.sequence(),
            anchor = %receipt.id,
            "anchored block"
        );

        let metadata = AnchorRecord {
            content_address: prepared.address,
            anchor_id: receipt.id,
            observed_at: Some(receipt.created_at),
        };
        Ok(CommittedBlock {
            virtual_block: VirtualBlock::new(metadata, prepared.block),
            report: prepared.report,
        })
    }
}

impl std::fmt::Debug for BlockBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockBuilder")
            .field("account", &self.account)
            .field("intake", &self.intake)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
