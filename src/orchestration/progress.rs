//! # Progress Reporting
//!
//! Callers observe an analysis through a [`ProgressCallback`]. Each
//! invocation runs on its own task and is bounded by a timeout, so a callback
//! that errors, panics or hangs only produces a warning on the result.

use super::batch_executor::panic_message;
use super::types::AnalysisResult;
use crate::error::BrandAuditError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Receiver of `(percent, message)` progress checkpoints
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    async fn on_progress(&self, percent: u8, message: &str) -> Result<(), BrandAuditError>;
}

/// Adapter turning a synchronous closure into a [`ProgressCallback`]
pub struct FnProgressCallback<F>(F);

impl<F> FnProgressCallback<F>
where
    F: Fn(u8, &str) -> Result<(), BrandAuditError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> ProgressCallback for FnProgressCallback<F>
where
    F: Fn(u8, &str) -> Result<(), BrandAuditError> + Send + Sync,
{
    async fn on_progress(&self, percent: u8, message: &str) -> Result<(), BrandAuditError> {
        (self.0)(percent, message)
    }
}

/// Drives the progress of one analysis run
pub struct ProgressTracker {
    callback: Option<Arc<dyn ProgressCallback>>,
    timeout: Duration,
}

impl ProgressTracker {
    pub fn new(callback: Option<Arc<dyn ProgressCallback>>, timeout: Duration) -> Self {
        Self { callback, timeout }
    }

    /// Advance the result to `percent` and notify the callback.
    ///
    /// Progress on the result never decreases; the callback is invoked with
    /// the result's progress after the update.
    pub async fn checkpoint(&self, result: &mut AnalysisResult, percent: u8, message: &str) {
        result.advance_progress(percent);
        let percent = result.progress;

        debug!(
            analysis_id = %result.analysis_id,
            progress = percent,
            message,
            "📊 Progress checkpoint"
        );

        let Some(callback) = &self.callback else {
            return;
        };

        if let Err(reason) = self.notify(Arc::clone(callback), percent, message).await {
            warn!(
                analysis_id = %result.analysis_id,
                progress = percent,
                reason = %reason,
                "⚠️ Progress callback failed"
            );
            result
                .warnings
                .push(format!("Progress callback failed at {percent}%: {reason}"));
        }
    }

    async fn notify(
        &self,
        callback: Arc<dyn ProgressCallback>,
        percent: u8,
        message: &str,
    ) -> Result<(), BrandAuditError> {
        let message = message.to_string();
        let mut handle =
            tokio::spawn(async move { callback.on_progress(percent, &message).await });

        match tokio::time::timeout(self.timeout, &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) if join_error.is_panic() => Err(BrandAuditError::ProgressCallback(
                format!("callback panicked: {}", panic_message(join_error.into_panic())),
            )),
            Ok(Err(join_error)) => Err(BrandAuditError::ProgressCallback(join_error.to_string())),
            Err(_) => {
                handle.abort();
                Err(BrandAuditError::ProgressCallback(format!(
                    "callback did not return within {}ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("has_callback", &self.callback.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::types::{AnalysisOptions, AnalysisRequest};
    use parking_lot::Mutex;

    fn result() -> AnalysisResult {
        let request = AnalysisRequest::new("Tesla", None, AnalysisOptions::default()).unwrap();
        AnalysisResult::new(&request)
    }

    struct SlowCallback;

    #[async_trait]
    impl ProgressCallback for SlowCallback {
        async fn on_progress(&self, _percent: u8, _message: &str) -> Result<(), BrandAuditError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_callback_receives_checkpoints() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let tracker = ProgressTracker::new(
            Some(Arc::new(FnProgressCallback::new(move |percent, message: &str| {
                sink.lock().push((percent, message.to_string()));
                Ok(())
            }))),
            Duration::from_secs(1),
        );

        let mut result = result();
        tracker.checkpoint(&mut result, 10, "Starting").await;
        tracker.checkpoint(&mut result, 20, "Collecting").await;

        assert_eq!(
            *seen.lock(),
            vec![(10, "Starting".to_string()), (20, "Collecting".to_string())]
        );
        assert!(result.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_callback_error_becomes_warning() {
        let tracker = ProgressTracker::new(
            Some(Arc::new(FnProgressCallback::new(|_, _: &str| {
                Err(BrandAuditError::ProgressCallback("socket closed".into()))
            }))),
            Duration::from_secs(1),
        );

        let mut result = result();
        tracker.checkpoint(&mut result, 10, "Starting").await;

        assert_eq!(result.progress, 10);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("socket closed"));
    }

    #[tokio::test]
    async fn test_panicking_callback_is_contained() {
        let tracker = ProgressTracker::new(
            Some(Arc::new(FnProgressCallback::new(|_, _: &str| -> Result<(), BrandAuditError> {
                panic!("ui thread gone")
            }))),
            Duration::from_secs(1),
        );

        let mut result = result();
        tracker.checkpoint(&mut result, 50, "LLM").await;

        assert_eq!(result.progress, 50);
        assert!(result.warnings[0].contains("ui thread gone"));
    }

    #[tokio::test]
    async fn test_slow_callback_times_out() {
        let tracker = ProgressTracker::new(Some(Arc::new(SlowCallback)), Duration::from_millis(20));

        let mut result = result();
        tracker.checkpoint(&mut result, 70, "Visual").await;

        assert_eq!(result.progress, 70);
        assert!(result.warnings[0].contains("did not return"));
    }

    #[tokio::test]
    async fn test_progress_is_not_lowered() {
        let tracker = ProgressTracker::new(None, Duration::from_secs(1));
        let mut result = result();

        tracker.checkpoint(&mut result, 50, "LLM").await;
        tracker.checkpoint(&mut result, 20, "Collecting").await;

        assert_eq!(result.progress, 50);
    }
}
