//! Bounded pool for synchronous provider calls.
//!
//! Calls run on tokio's blocking threads through `spawn_blocking`; a
//! semaphore caps how many run at once. The permit travels into the blocking
//! closure so it is held for exactly as long as the call runs, even when the
//! awaiting future has been dropped by a timeout.

use super::batch_executor::panic_message;
use crate::providers::ProviderError;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::error;

#[derive(Debug, Clone)]
pub struct BlockingWorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl BlockingWorkerPool {
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

    pub fn available_workers(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run a blocking provider call on the pool
    pub async fn run<F, T>(&self, call: F) -> Result<T, ProviderError>
    where
        F: FnOnce() -> Result<T, ProviderError> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ProviderError::other("worker pool is shut down"))?;

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            call()
        });

        match handle.await {
            Ok(result) => result,
            Err(join_error) if join_error.is_panic() => {
                let message = panic_message(join_error.into_panic());
                error!(panic = %message, "💥 Blocking provider call panicked");
                Err(ProviderError::other(format!(
                    "provider panicked: {message}"
                )))
            }
            Err(join_error) => Err(ProviderError::other(format!(
                "blocking call did not complete: {join_error}"
            ))),
        }
    }
}

impl Default for BlockingWorkerPool {
    fn default() -> Self {
        Self::new(crate::constants::defaults::WORKER_POOL_SIZE)
    }
}
