use async_trait::async_trait;
use bytes::Bytes;
use vchain_types::ContentAddress;

use crate::error::StoreResult;

/// Content-addressed blob storage.
///
/// Content is named purely by the hash of its bytes, so `put` is idempotent:
/// storing the same bytes twice returns the same address and is not an
/// error. A store is untrusted; callers verify what `get` returns.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn put(&self, bytes: Bytes) -> StoreResult<ContentAddress>;

    /// `Ok(None)` when the store has no object under `address`.
    async fn get(&self, address: &ContentAddress) -> StoreResult<Option<Bytes>>;

    async fn contains(&self, address: &ContentAddress) -> StoreResult<bool> {
        Ok(self.get(address).await?.is_some())
    }
}
