use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vchain_intake::{InMemoryOperationQueue, QueueSnapshot};
use vchain_ledger::{InMemoryLedger, LedgerSnapshot};
use vchain_store::{InMemoryContentStore, StoreSnapshot};

/// On-disk form of a sandbox.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SandboxFile {
    #[serde(default)]
    ledger: LedgerSnapshot,
    #[serde(default)]
    store: StoreSnapshot,
    #[serde(default)]
    queue: QueueSnapshot,
}

/// In-memory ledger, content store and queue, persisted as one JSON file.
pub struct Sandbox {
    path: PathBuf,
    pub ledger: Arc<InMemoryLedger>,
    pub store: Arc<InMemoryContentStore>,
    pub queue: Arc<InMemoryOperationQueue>,
}

impl Sandbox {
    /// Load the sandbox at `path`. A missing file is an empty sandbox.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading sandbox {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing sandbox {}", path.display()))?
        } else {
            debug!(path = %path.display(), "starting empty sandbox");
            SandboxFile::default()
        };

        Ok(Self {
            ledger: Arc::new(InMemoryLedger::from_snapshot(file.ledger)),
            store: Arc::new(InMemoryContentStore::from_snapshot(file.store)?),
            queue: Arc::new(InMemoryOperationQueue::from_snapshot(file.queue)),
            path,
        })
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let file = SandboxFile {
            ledger: self.ledger.snapshot(),
            store: self.store.snapshot(),
            queue: self.queue.snapshot(),
        };
        let text = serde_json::to_string_pretty(&file)?;
        std::fs::write(&self.path, text)
            .with_context(|| format!("writing sandbox {}", self.path.display()))?;
        debug!(path = %self.path.display(), "saved sandbox");
        Ok(())
    }
}
