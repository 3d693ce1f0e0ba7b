//! Bounded worker pool for the expensive fetch tiers
//!
//! Tasks run on their own tokio task once a permit is available, so a slow
//! impersonation request or a browser launch never holds up the request
//! handler that scheduled it beyond its own await.

use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::warn;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("worker pool is closed")]
    Closed,

    #[error("worker task failed: {0}")]
    Join(String),
}

/// Semaphore-gated spawner
///
/// Pattern from the deep research fan-out: acquire a permit, spawn, release on drop.
#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Create a pool running at most `size` tasks at once (minimum 1)
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Tasks currently able to start without waiting
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `task` on the pool and wait for its output
    ///
    /// The spawned task keeps running to completion even if the caller stops
    /// waiting, so tiers that own external processes still reach their cleanup.
    pub async fn run<F, T>(&self, task: F) -> Result<T, PoolError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        let handle = tokio::spawn(async move {
            let _permit = permit;
            task.await
        });

        handle.await.map_err(|e| {
            warn!("Worker task did not complete: {}", e);
            PoolError::Join(e.to_string())
        })
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(4)
    }
}
