//! Fallback providers keyed by `dependency.operation`.

use super::error_classifier::ErrorInfo;
use super::service::RecoveryContext;
use crate::metrics::MetricKey;
use crate::orchestration::types::StagePayload;
use crate::providers::ProviderError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Alternate source for a stage payload when the primary provider cannot
/// serve the call
#[async_trait]
pub trait FallbackProvider: Send + Sync {
    async fn fallback(
        &self,
        context: &RecoveryContext,
        error: &ErrorInfo,
    ) -> Result<StagePayload, ProviderError>;
}

/// Adapter turning a closure into a [`FallbackProvider`]
pub struct FnFallback<F>(F);

impl<F> FnFallback<F>
where
    F: Fn(&RecoveryContext) -> Result<StagePayload, ProviderError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> FallbackProvider for FnFallback<F>
where
    F: Fn(&RecoveryContext) -> Result<StagePayload, ProviderError> + Send + Sync,
{
    async fn fallback(
        &self,
        context: &RecoveryContext,
        _error: &ErrorInfo,
    ) -> Result<StagePayload, ProviderError> {
        (self.0)(context)
    }
}

/// Concurrent registry of fallbacks
#[derive(Clone, Default)]
pub struct FallbackRegistry {
    providers: Arc<DashMap<String, Arc<dyn FallbackProvider>>>,
}

impl FallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fallback, replacing any previous one for the same key
    pub fn register(&self, dependency: &str, operation: &str, provider: Arc<dyn FallbackProvider>) {
        self.providers
            .insert(MetricKey::new(dependency, operation).to_string(), provider);
    }

    pub fn get(&self, dependency: &str, operation: &str) -> Option<Arc<dyn FallbackProvider>> {
        self.providers
            .get(&MetricKey::new(dependency, operation).to_string())
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, dependency: &str, operation: &str) -> bool {
        self.providers
            .contains_key(&MetricKey::new(dependency, operation).to_string())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.providers.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

impl std::fmt::Debug for FallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::NewsResult;
    use crate::recovery::{ErrorClassifier, ErrorContext, StandardErrorClassifier};

    #[test]
    fn test_register_and_lookup_by_key() {
        let registry = FallbackRegistry::new();
        registry.register(
            "news",
            "search_news",
            Arc::new(FnFallback::new(|_ctx: &RecoveryContext| {
                Ok(StagePayload::NewsResult(NewsResult::default()))
            })),
        );

        assert!(registry.contains("news", "search_news"));
        assert!(!registry.contains("news", "other"));
        assert!(registry.get("llm", "search_news").is_none());
        assert_eq!(registry.keys(), vec!["news.search_news".to_string()]);
    }

    #[test]
    fn test_closure_fallback_receives_context() {
        let provider = FnFallback::new(|ctx: &RecoveryContext| {
            Ok(StagePayload::NewsResult(NewsResult {
                total_results: ctx.company_name.len() as u32,
                ..Default::default()
            }))
        });
        let context = RecoveryContext::new("news", "search_news", "Tesla");
        let error = StandardErrorClassifier::new().classify_error(
            &ProviderError::Timeout("slow".into()),
            &ErrorContext {
                dependency: "news".into(),
                operation: "search_news".into(),
                retry_count: 3,
                max_retries: 3,
                strategy_override: None,
            },
        );

        let payload = tokio_test::block_on(provider.fallback(&context, &error)).unwrap();
        assert!(matches!(
            payload,
            StagePayload::NewsResult(NewsResult { total_results: 5, .. })
        ));
    }
}
