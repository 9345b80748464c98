use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{QueueError, QueueResult};
use crate::record::QueueRecord;

/// Read boundary to the document store holding pending operations.
///
/// The engine only reads. Marking records applied belongs to whoever owns
/// the queue.
#[async_trait]
pub trait OperationQueue: Send + Sync {
    /// Every record not yet applied, in queue order.
    async fn query_unapplied(&self) -> QueueResult<Vec<QueueRecord>>;
}

/// In-memory queue for tests, sandboxes, and embedding.
pub struct InMemoryOperationQueue {
    records: RwLock<Vec<QueueRecord>>,
    offline: AtomicBool,
}

/// Serializable contents of an [`InMemoryOperationQueue`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub records: Vec<QueueRecord>,
}

impl InMemoryOperationQueue {
    pub fn new() -> Self {
        Self::from_snapshot(QueueSnapshot::default())
    }

    pub fn from_snapshot(snapshot: QueueSnapshot) -> Self {
        Self {
            records: RwLock::new(snapshot.records),
            offline: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            records: self.records.read().expect("lock poisoned").clone(),
        }
    }

    /// Append a record. Returns its id.
    pub fn push(&self, record: QueueRecord) -> Uuid {
        let id = record.id;
        self.records.write().expect("lock poisoned").push(record);
        id
    }

    /// Append a new unapplied record built from raw fields.
    pub fn enqueue(
        &self,
        op_code: impl Into<String>,
        creator_uid: impl Into<String>,
        data: serde_json::Value,
    ) -> Uuid {
        self.push(QueueRecord::new(op_code, creator_uid, data))
    }

    /// Flag records as applied. Fails without changing anything if an id
    /// is not in the queue.
    pub fn mark_applied(&self, ids: &[Uuid]) -> QueueResult<usize> {
        let mut records = self.records.write().expect("lock poisoned");
        let known: HashSet<Uuid> = records.iter().map(|r| r.id).collect();
        if let Some(missing) = ids.iter().find(|id| !known.contains(id)) {
            return Err(QueueError::UnknownRecord(*missing));
        }

        let wanted: HashSet<&Uuid> = ids.iter().collect();
        let mut changed = 0;
        for record in records.iter_mut().filter(|r| wanted.contains(&r.id)) {
            if !record.applied {
                record.applied = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().expect("lock poisoned").is_empty()
    }

    /// Make every call fail with [`QueueError::Unavailable`] until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

impl Default for InMemoryOperationQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OperationQueue for InMemoryOperationQueue {
    async fn query_unapplied(&self) -> QueueResult<Vec<QueueRecord>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(QueueError::Unavailable("queue is offline".into()));
        }
        let records = self.records.read().expect("lock poisoned");
        Ok(records.iter().filter(|r| !r.applied).cloned().collect())
    }
}

impl std::fmt::Debug for InMemoryOperationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryOperationQueue")
            .field("record_count", &self.len())
            .finish()
    }
}
