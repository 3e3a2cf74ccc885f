//! # Error Management Service
//!
//! Runs one provider operation under the recovery policy: circuit breaker
//! admission, a per-attempt timeout, performance recording, classification of
//! failures and dispatch on the resulting [`RecoveryStrategy`].

use super::error_classifier::{
    ErrorClassifier, ErrorContext, ErrorInfo, RecoveryStrategy, StandardErrorClassifier,
};
use super::fallback::{FallbackProvider, FallbackRegistry};
use crate::config::{AuditConfig, RetryConfig};
use crate::logging::log_error;
use crate::metrics::{MetricKey, PerformanceRecorder};
use crate::orchestration::batch_executor::panic_message;
use crate::orchestration::types::{StageOutcome, StagePayload};
use crate::providers::ProviderError;
use crate::recovery::ErrorCategory;
use crate::resilience::CircuitBreakerManager;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Identifies the operation being recovered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryContext {
    pub dependency: String,
    pub operation: String,
    pub company_name: String,
    pub website_url: Option<String>,
    /// Replaces the classifier's strategy for every failure of this call
    pub strategy_override: Option<RecoveryStrategy>,
}

impl RecoveryContext {
    pub fn new(
        dependency: impl Into<String>,
        operation: impl Into<String>,
        company_name: impl Into<String>,
    ) -> Self {
        Self {
            dependency: dependency.into(),
            operation: operation.into(),
            company_name: company_name.into(),
            website_url: None,
            strategy_override: None,
        }
    }

    pub fn with_website_url(mut self, website_url: Option<&str>) -> Self {
        self.website_url = website_url.map(str::to_string);
        self
    }

    pub fn with_strategy_override(mut self, strategy: RecoveryStrategy) -> Self {
        self.strategy_override = Some(strategy);
        self
    }

    pub fn metric_key(&self) -> MetricKey {
        MetricKey::new(&self.dependency, &self.operation)
    }
}

/// Local synthesis of a reduced-fidelity payload
pub type DegradeFn = Box<dyn FnOnce() -> StagePayload + Send>;

/// A payload obtained for an operation
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub payload: StagePayload,
    /// `None` when the first attempt succeeded
    pub via: Option<RecoveryStrategy>,
    /// Attempts made against the primary provider
    pub attempts: u32,
}

/// Terminal outcome for an operation that produced no payload
#[derive(Debug, Clone, Error)]
pub enum RecoveryFailure {
    #[error("{dependency} is temporarily unavailable, retry after {} seconds", retry_after.as_secs().max(1))]
    CircuitOpen {
        dependency: String,
        retry_after: Duration,
    },

    #[error("{}", error.user_message)]
    UserActionRequired { error: ErrorInfo },

    #[error("{}", error.user_message)]
    Failed { error: ErrorInfo },
}

impl RecoveryFailure {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RecoveryFailure::CircuitOpen { .. } => ErrorCategory::Unknown,
            RecoveryFailure::UserActionRequired { error } | RecoveryFailure::Failed { error } => {
                error.category
            }
        }
    }

    pub fn error_info(&self) -> Option<&ErrorInfo> {
        match self {
            RecoveryFailure::CircuitOpen { .. } => None,
            RecoveryFailure::UserActionRequired { error } | RecoveryFailure::Failed { error } => {
                Some(error)
            }
        }
    }

    /// Stage outcome describing this failure
    pub fn to_outcome(&self) -> StageOutcome {
        match self {
            RecoveryFailure::CircuitOpen { retry_after, .. } => {
                StageOutcome::circuit_open(self.to_string(), *retry_after)
            }
            _ => StageOutcome::failure(self.to_string(), self.category()),
        }
    }
}

/// Error management service shared by every analysis run of an orchestrator
pub struct ErrorManagementService {
    classifier: Arc<dyn ErrorClassifier>,
    circuit_breakers: CircuitBreakerManager,
    performance: Arc<PerformanceRecorder>,
    fallbacks: FallbackRegistry,
    retry: RetryConfig,
    operation_timeout: Duration,
}

impl std::fmt::Debug for ErrorManagementService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorManagementService")
            .field("classifier", &self.classifier.classifier_name())
            .field("fallbacks", &self.fallbacks)
            .field("retry", &self.retry)
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

impl ErrorManagementService {
    pub fn new(
        config: &AuditConfig,
        circuit_breakers: CircuitBreakerManager,
        performance: Arc<PerformanceRecorder>,
    ) -> Self {
        Self::with_classifier(
            config,
            Arc::new(StandardErrorClassifier::new()),
            circuit_breakers,
            performance,
        )
    }

    /// Create a service with a custom classifier
    pub fn with_classifier(
        config: &AuditConfig,
        classifier: Arc<dyn ErrorClassifier>,
        circuit_breakers: CircuitBreakerManager,
        performance: Arc<PerformanceRecorder>,
    ) -> Self {
        Self {
            classifier,
            circuit_breakers,
            performance,
            fallbacks: FallbackRegistry::new(),
            retry: config.retry.clone(),
            operation_timeout: config.orchestration.operation_timeout(),
        }
    }

    pub fn register_fallback(
        &self,
        dependency: &str,
        operation: &str,
        provider: Arc<dyn FallbackProvider>,
    ) {
        info!(dependency, operation, "Registered fallback provider");
        self.fallbacks.register(dependency, operation, provider);
    }

    pub fn fallbacks(&self) -> &FallbackRegistry {
        &self.fallbacks
    }

    pub fn circuit_breakers(&self) -> &CircuitBreakerManager {
        &self.circuit_breakers
    }

    pub fn performance(&self) -> &Arc<PerformanceRecorder> {
        &self.performance
    }

    /// Run `operation` until it yields a payload or recovery gives up.
    ///
    /// Every attempt asks the dependency's circuit breaker for admission and
    /// is bounded by the operation timeout. `degrade` is consulted only when
    /// the strategy for a failure is [`RecoveryStrategy::Degrade`].
    pub async fn execute<F, Fut>(
        &self,
        context: &RecoveryContext,
        degrade: Option<DegradeFn>,
        mut operation: F,
    ) -> Result<Recovered, RecoveryFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<StagePayload, ProviderError>>,
    {
        let breaker = self.circuit_breakers.get_circuit_breaker(&context.dependency);
        let key = context.metric_key();
        let mut degrade = degrade;
        let mut retry_count = 0u32;
        let mut attempts = 0u32;

        loop {
            if let Err(retry_after) = breaker.try_acquire() {
                warn!(
                    dependency = %context.dependency,
                    operation = %context.operation,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "⚡ Call short-circuited by open circuit"
                );
                return Err(RecoveryFailure::CircuitOpen {
                    dependency: context.dependency.clone(),
                    retry_after,
                });
            }

            attempts += 1;
            let started = Instant::now();
            let attempt = AssertUnwindSafe(operation()).catch_unwind();
            let result = match tokio::time::timeout(self.operation_timeout, attempt).await {
                Ok(Ok(result)) => result,
                Ok(Err(payload)) => {
                    let message = panic_message(payload);
                    error!(operation = %key, panic = %message, "💥 Provider call panicked");
                    Err(ProviderError::other(format!("provider panicked: {message}")))
                }
                Err(_) => Err(ProviderError::Timeout(format!(
                    "{key} exceeded {}ms",
                    self.operation_timeout.as_millis()
                ))),
            };
            let elapsed = started.elapsed();
            self.performance.record(&key, elapsed, result.is_ok());

            let error = match result {
                Ok(payload) => {
                    breaker.record_success(elapsed);
                    debug!(
                        operation = %key,
                        attempts,
                        duration_ms = elapsed.as_millis() as u64,
                        "Operation succeeded"
                    );
                    return Ok(Recovered {
                        payload,
                        via: (retry_count > 0).then_some(RecoveryStrategy::Retry),
                        attempts,
                    });
                }
                Err(error) => error,
            };

            let info = self.classifier.classify_error(
                &error,
                &ErrorContext {
                    dependency: context.dependency.clone(),
                    operation: context.operation.clone(),
                    retry_count,
                    max_retries: self.retry.max_retries,
                    strategy_override: context.strategy_override,
                },
            );
            breaker.record_failure(elapsed, info.severity.counts_toward_circuit());
            log_error(
                &context.dependency,
                &context.operation,
                &info.technical_message,
                Some(&format!(
                    "category={} strategy={} retry_count={}",
                    info.category, info.strategy, info.retry_count
                )),
            );

            match info.strategy {
                RecoveryStrategy::Retry if info.retries_remaining() => {
                    let delay = info
                        .retry_after
                        .map(|retry_after| retry_after.min(self.retry.max_delay()))
                        .unwrap_or_else(|| self.retry.backoff_delay(retry_count));
                    info!(
                        operation = %key,
                        retry = retry_count + 1,
                        max_retries = info.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "🔄 Retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                }
                RecoveryStrategy::Retry | RecoveryStrategy::Fallback => {
                    return self.invoke_fallback(context, info, attempts).await;
                }
                RecoveryStrategy::Degrade => {
                    return match degrade.take() {
                        Some(synthesize) => {
                            info!(operation = %key, "📉 Returning degraded result");
                            Ok(Recovered {
                                payload: synthesize(),
                                via: Some(RecoveryStrategy::Degrade),
                                attempts,
                            })
                        }
                        None => Err(RecoveryFailure::Failed { error: info }),
                    };
                }
                RecoveryStrategy::UserAction => {
                    return Err(RecoveryFailure::UserActionRequired { error: info });
                }
                RecoveryStrategy::Fail => {
                    return Err(RecoveryFailure::Failed { error: info });
                }
            }
        }
    }

    async fn invoke_fallback(
        &self,
        context: &RecoveryContext,
        info: ErrorInfo,
        attempts: u32,
    ) -> Result<Recovered, RecoveryFailure> {
        let Some(provider) = self.fallbacks.get(&context.dependency, &context.operation) else {
            return Err(RecoveryFailure::Failed { error: info });
        };

        info!(
            dependency = %context.dependency,
            operation = %context.operation,
            category = %info.category,
            "🛟 Invoking fallback provider"
        );

        match provider.fallback(context, &info).await {
            Ok(payload) => Ok(Recovered {
                payload,
                via: Some(RecoveryStrategy::Fallback),
                attempts,
            }),
            Err(fallback_error) => {
                warn!(
                    dependency = %context.dependency,
                    operation = %context.operation,
                    error = %fallback_error,
                    "Fallback provider failed"
                );
                let mut error = info;
                error.strategy = RecoveryStrategy::Fail;
                error.technical_message =
                    format!("{}; fallback failed: {fallback_error}", error.technical_message);
                Err(RecoveryFailure::Failed { error })
            }
        }
    }
}
