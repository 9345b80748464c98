use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::EngineResult;

/// Proof that the holder may build the next block. Released on drop.
pub struct BuildGuard {
    held: Option<Box<dyn Any + Send + Sync>>,
}

impl BuildGuard {
    /// A guard that holds nothing.
    pub fn unguarded() -> Self {
        Self { held: None }
    }

    /// Keep `held` alive until the guard is dropped.
    pub fn holding(held: impl Any + Send + Sync) -> Self {
        Self {
            held: Some(Box::new(held)),
        }
    }
}

impl std::fmt::Debug for BuildGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildGuard")
            .field("held", &self.held.is_some())
            .finish()
    }
}

/// Keeps block builders for the same chain from racing each other.
///
/// The builder holds the guard from reading the chain head until the anchor
/// is submitted. Implementations backed by an external lock service plug in
/// here; the ledger's sequence check still rejects a losing submission.
#[async_trait]
pub trait BuildCoordinator: Send + Sync {
    async fn acquire(&self) -> EngineResult<BuildGuard>;
}

/// No mutual exclusion. For deployments with a single builder process.
#[derive(Clone, Copy, Debug, Default)]
pub struct Uncoordinated;

#[async_trait]
impl BuildCoordinator for Uncoordinated {
    async fn acquire(&self) -> EngineResult<BuildGuard> {
        Ok(BuildGuard::unguarded())
    }
}

/// In-process lock. Serializes builders that share one `LocalBuildLock`.
#[derive(Clone, Debug, Default)]
pub struct LocalBuildLock {
    lock: Arc<Mutex<()>>,
}

impl LocalBuildLock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BuildCoordinator for LocalBuildLock {
    async fn acquire(&self) -> EngineResult<BuildGuard> {
        let guard = self.lock.clone().lock_owned().await;
        debug!("acquired local build lock");
        Ok(BuildGuard::holding(guard))
    }
}
