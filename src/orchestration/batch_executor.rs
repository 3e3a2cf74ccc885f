//! # Task Batch Executor
//!
//! Runs a named set of independent async tasks concurrently and returns one
//! result per name. Each task is spawned onto its own tokio task and acquires
//! a permit from a shared semaphore before running, so at most
//! `max_concurrent` tasks run at once across every batch of an executor.
//! Panics and failures are captured per task and never affect siblings.

use crate::recovery::ErrorCategory;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

/// Failure captured at a task boundary
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct TaskFailure {
    pub message: String,
    pub category: ErrorCategory,
}

impl TaskFailure {
    pub fn new(message: impl Into<String>, category: ErrorCategory) -> Self {
        Self {
            message: message.into(),
            category,
        }
    }
}

/// A named unit of work for [`TaskBatchExecutor::execute_batch`]
pub struct BatchTask<T> {
    pub name: String,
    pub future: BoxFuture<'static, Result<T, TaskFailure>>,
}

impl<T> BatchTask<T> {
    pub fn new<F>(name: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = Result<T, TaskFailure>> + Send + 'static,
    {
        Self {
            name: name.into(),
            future: future.boxed(),
        }
    }
}

impl<T> std::fmt::Debug for BatchTask<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchTask").field("name", &self.name).finish()
    }
}

/// Result of every task in a batch, keyed by task name
pub type BatchResults<T> = HashMap<String, Result<T, TaskFailure>>;

#[derive(Debug)]
pub struct TaskBatchExecutor {
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    tasks_executed: AtomicUsize,
}

impl TaskBatchExecutor {
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            tasks_executed: AtomicUsize::new(0),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Permits not currently held by a running task
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Tasks run to completion (successfully or not) over the executor's life
    pub fn tasks_executed(&self) -> usize {
        self.tasks_executed.load(Ordering::Relaxed)
    }

    /// Run every task concurrently and wait for all of them.
    ///
    /// Task names are expected to be unique; a duplicate name keeps the result
    /// of the later task.
    pub async fn execute_batch<T>(&self, tasks: Vec<BatchTask<T>>) -> BatchResults<T>
    where
        T: Send + 'static,
    {
        if tasks.is_empty() {
            return HashMap::new();
        }

        let batch_size = tasks.len();
        let started = Instant::now();
        debug!(
            batch_size,
            max_concurrent = self.max_concurrent,
            "🚀 Executing task batch"
        );

        let handles: Vec<_> = tasks
            .into_iter()
            .map(|task| {
                let permits = Arc::clone(&self.permits);
                let name = task.name;
                let future = task.future;
                let handle = tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await.map_err(|_| {
                        TaskFailure::new("executor permits closed", ErrorCategory::Unknown)
                    })?;
                    future.await
                });
                (name, handle)
            })
            .collect();

        let (names, handles): (Vec<String>, Vec<_>) = handles.into_iter().unzip();
        let joined = join_all(handles).await;

        let mut results = HashMap::with_capacity(batch_size);
        for (name, joined) in names.into_iter().zip(joined) {
            let result = match joined {
                Ok(result) => result,
                Err(join_error) if join_error.is_panic() => {
                    let message = panic_message(join_error.into_panic());
                    error!(task = %name, panic = %message, "💥 Task panicked");
                    Err(TaskFailure::new(
                        format!("task panicked: {message}"),
                        ErrorCategory::Unknown,
                    ))
                }
                Err(_) => Err(TaskFailure::new("task was cancelled", ErrorCategory::Unknown)),
            };

            if results.insert(name.clone(), result).is_some() {
                warn!(task = %name, "Duplicate task name in batch, keeping later result");
            }
        }

        self.tasks_executed.fetch_add(batch_size, Ordering::Relaxed);
        debug!(
            batch_size,
            failed = results.values().filter(|r| r.is_err()).count(),
            duration_ms = started.elapsed().as_millis() as u64,
            "✅ Task batch complete"
        );

        results
    }
}

impl Default for TaskBatchExecutor {
    fn default() -> Self {
        Self::new(crate::constants::defaults::MAX_CONCURRENT_CALLS)
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
