use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use vchain_codec::compute_content_address;
use vchain_types::ContentAddress;

use crate::error::{StoreError, StoreResult};
use crate::traits::ContentStore;

/// In-memory, HashMap-based content store.
///
/// Intended for tests and embedding. Objects are held behind a `RwLock`;
/// `Bytes` makes reads cheap clones.
pub struct InMemoryContentStore {
    objects: RwLock<HashMap<ContentAddress, Bytes>>,
    offline: AtomicBool,
}

/// Serializable contents of an [`InMemoryContentStore`], hex-encoded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub objects: BTreeMap<ContentAddress, String>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// Restore from a snapshot. Entries are taken as-is.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> StoreResult<Self> {
        let mut objects = HashMap::with_capacity(snapshot.objects.len());
        for (address, encoded) in snapshot.objects {
            let bytes = hex::decode(&encoded)
                .map_err(|e| StoreError::Serialization(format!("{address}: {e}")))?;
            objects.insert(address, Bytes::from(bytes));
        }
        Ok(Self {
            objects: RwLock::new(objects),
            offline: AtomicBool::new(false),
        })
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let map = self.objects.read().expect("lock poisoned");
        StoreSnapshot {
            objects: map
                .iter()
                .map(|(address, bytes)| (address.clone(), hex::encode(bytes)))
                .collect(),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Store `bytes` under an arbitrary address without hashing them.
    ///
    /// Simulates a faulty or hostile store for verification tests.
    pub fn insert_raw(&self, address: ContentAddress, bytes: impl Into<Bytes>) {
        let mut map = self.objects.write().expect("lock poisoned");
        map.insert(address, bytes.into());
    }

    /// Drop an object. Returns `true` if it was present.
    pub fn remove(&self, address: &ContentAddress) -> bool {
        let mut map = self.objects.write().expect("lock poisoned");
        map.remove(address).is_some()
    }

    /// Make every call fail with [`StoreError::Unavailable`] until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is offline".into()));
        }
        Ok(())
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn put(&self, bytes: Bytes) -> StoreResult<ContentAddress> {
        self.ensure_online()?;
        let address = compute_content_address(&bytes);
        let mut map = self.objects.write().expect("lock poisoned");
        // Same address always means same content.
        map.entry(address.clone()).or_insert(bytes);
        Ok(address)
    }

    async fn get(&self, address: &ContentAddress) -> StoreResult<Option<Bytes>> {
        self.ensure_online()?;
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.get(address).cloned())
    }

    async fn contains(&self, address: &ContentAddress) -> StoreResult<bool> {
        self.ensure_online()?;
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(address))
    }
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentStore")
            .field("object_count", &self.len())
            .finish()
    }
}
