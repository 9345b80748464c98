use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;
use vchain_codec::{compute_content_address, decode_block, decode_header};
use vchain_types::{Block, ContentAddress, SchemaVersion};

use crate::error::ResolveError;
use crate::traits::ContentStore;

/// Outcome of resolving an address against a supported schema version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolved {
    /// A block of the supported version.
    Current(Block),
    /// Authentic content written under another schema version. Only its
    /// header is read.
    Foreign {
        version: SchemaVersion,
        max_operation_sequence: Option<u64>,
    },
}

/// Fetches block bodies from a content store and verifies them.
///
/// Trust comes only from the hash: bytes that do not hash to the requested
/// address are rejected whatever the store claims. Failures are returned to
/// the caller, never retried here.
#[derive(Clone)]
pub struct ContentResolver {
    store: Arc<dyn ContentStore>,
}

impl ContentResolver {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Fetch the raw bytes at `address`, verified against it.
    pub async fn fetch_verified(&self, address: &ContentAddress) -> Result<Bytes, ResolveError> {
        let bytes = match self.store.get(address).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                return Err(ResolveError::ContentUnavailable {
                    address: address.clone(),
                    reason: "object not found".into(),
                })
            }
            Err(e) => {
                return Err(ResolveError::ContentUnavailable {
                    address: address.clone(),
                    reason: e.to_string(),
                })
            }
        };

        let computed = compute_content_address(&bytes);
        if computed != *address {
            return Err(ResolveError::ContentMismatch {
                address: address.clone(),
                computed,
            });
        }
        Ok(bytes)
    }

    /// Fetch, verify and decode the block at `address`.
    pub async fn resolve(&self, address: &ContentAddress) -> Result<Block, ResolveError> {
        let bytes = self.fetch_verified(address).await?;
        let block = decode_block(&bytes).map_err(|source| ResolveError::MalformedContent {
            address: address.clone(),
            source,
        })?;
        debug!(address = %address.short(), sequence = block.sequence, "resolved block");
        Ok(block)
    }

    /// Like [`resolve`](Self::resolve), but blocks of any version other than
    /// `supported` are only classified, so an older body shape cannot fail
    /// the read.
    pub async fn resolve_versioned(
        &self,
        address: &ContentAddress,
        supported: SchemaVersion,
    ) -> Result<Resolved, ResolveError> {
        let bytes = self.fetch_verified(address).await?;
        let malformed = |source| ResolveError::MalformedContent {
            address: address.clone(),
            source,
        };

        let header = decode_header(&bytes).map_err(malformed)?;
        if header.version != supported {
            debug!(address = %address.short(), version = %header.version, %supported, "foreign schema version");
            return Ok(Resolved::Foreign {
                version: header.version,
                max_operation_sequence: header.max_operation_sequence,
            });
        }

        let block = decode_block(&bytes).map_err(malformed)?;
        debug!(address = %address.short(), sequence = block.sequence, "resolved block");
        Ok(Resolved::Current(block))
    }
}

impl std::fmt::Debug for ContentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use vchain_codec::{encode_block, CodecError};

    use super::*;
    use crate::memory::InMemoryContentStore;

    async fn setup() -> (Arc<InMemoryContentStore>, ContentResolver) {
        let store = Arc::new(InMemoryContentStore::new());
        let resolver = ContentResolver::new(store.clone());
        (store, resolver)
    }

    fn genesis() -> Block {
        Block::new(0, SchemaVersion::V1, None, vec![])
    }

    #[tokio::test]
    async fn resolves_stored_block() {
        let (store, resolver) = setup().await;
        let address = store
            .put(Bytes::from(encode_block(&genesis()).unwrap()))
            .await
            .unwrap();
        assert_eq!(resolver.resolve(&address).await.unwrap(), genesis());
    }

    #[tokio::test]
    async fn missing_content_is_unavailable() {
        let (_store, resolver) = setup().await;
        let address = compute_content_address(b"absent");
        let err = resolver.resolve(&address).await.unwrap_err();
        assert!(matches!(err, ResolveError::ContentUnavailable { .. }));
        assert!(err.is_retryable());
        assert_eq!(err.address(), &address);
    }

    #[tokio::test]
    async fn store_failure_is_unavailable() {
        let (store, resolver) = setup().await;
        let address = store
            .put(Bytes::from(encode_block(&genesis()).unwrap()))
            .await
            .unwrap();
        store.set_offline(true);
        let err = resolver.resolve(&address).await.unwrap_err();
        assert!(matches!(err, ResolveError::ContentUnavailable { reason, .. } if reason.contains("offline")));
    }

    #[tokio::test]
    async fn substituted_bytes_are_a_mismatch() {
        let (store, resolver) = setup().await;
        let address = compute_content_address(&encode_block(&genesis()).unwrap());
        let forged = Block::new(0, SchemaVersion::V1, None, vec![]);
        let mut forged_bytes = encode_block(&forged).unwrap();
        forged_bytes.push(b'\n');
        store.insert_raw(address.clone(), forged_bytes.clone());

        let err = resolver.resolve(&address).await.unwrap_err();
        assert_eq!(
            err,
            ResolveError::ContentMismatch {
                address,
                computed: compute_content_address(&forged_bytes),
            }
        );
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn authentic_non_block_is_malformed() {
        let (store, resolver) = setup().await;
        let address = store.put(Bytes::from_static(b"just a video")).await.unwrap();
        let err = resolver.resolve(&address).await.unwrap_err();
        assert!(matches!(
            err,
            ResolveError::MalformedContent {
                source: CodecError::Serialization(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn versioned_resolution_classifies_foreign_blocks() {
        let (store, resolver) = setup().await;
        let legacy = br#"{"sequence":0,"version":0,"prev_hash":null,"operations":[{"sequence":0,"op_code":"TRUST","creator_mid":"m1","data":{"to_mid":"m2"}}]}"#;
        let legacy_addr = store.put(Bytes::from_static(legacy)).await.unwrap();
        let current_addr = store
            .put(Bytes::from(encode_block(&genesis()).unwrap()))
            .await
            .unwrap();

        assert_eq!(
            resolver
                .resolve_versioned(&legacy_addr, SchemaVersion::V1)
                .await
                .unwrap(),
            Resolved::Foreign {
                version: SchemaVersion(0),
                max_operation_sequence: Some(0),
            }
        );
        assert_eq!(
            resolver
                .resolve_versioned(&current_addr, SchemaVersion::V1)
                .await
                .unwrap(),
            Resolved::Current(genesis())
        );
        // The strict path refuses the legacy shape.
        assert!(resolver.resolve(&legacy_addr).await.is_err());
    }
}
