//! # Brand Audit Configuration
//!
//! Layered configuration for the analysis orchestrator and its resilience
//! services. Defaults live in code, and are overridden in order by
//! `config/brand-audit.toml`, `config/brand-audit.<environment>.toml`,
//! `BRAND_AUDIT__*` environment variables and finally the well-known
//! provider credential variables (`OPENROUTER_API_KEY` and friends).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use brand_audit_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let permits = manager.config().orchestration.max_concurrent_calls;
//! let cooldown = manager.config().circuit_breakers.cooldown();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::defaults;
use crate::resilience::CircuitBreakerConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Structured logging settings
    pub logging: LoggingConfig,

    /// Concurrency and timeout settings for analysis runs
    pub orchestration: OrchestrationConfig,

    /// Retry and backoff policy
    pub retry: RetryConfig,

    /// Circuit breaker thresholds
    pub circuit_breakers: CircuitBreakerSettings,

    /// Performance recorder sizing
    pub performance: PerformanceConfig,

    /// Third-party credentials; their presence drives reported capabilities
    pub credentials: CredentialsConfig,
}

impl AuditConfig {
    /// Validate every section
    pub fn validate(&self) -> ConfigResult<()> {
        self.orchestration.validate()?;
        self.retry.validate()?;
        self.circuit_breakers.validate()?;
        self.performance.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// Permits bounding simultaneous outstanding external calls
    pub max_concurrent_calls: usize,
    /// Workers available for synchronous provider calls
    pub worker_pool_size: usize,
    /// Per-attempt timeout for external calls
    pub operation_timeout_seconds: u64,
    /// Upper bound on a single progress callback invocation
    pub progress_callback_timeout_ms: u64,
    /// News lookback passed to the news provider
    pub news_days_back: u32,
}

impl OrchestrationConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_seconds)
    }

    pub fn progress_callback_timeout(&self) -> Duration {
        Duration::from_millis(self.progress_callback_timeout_ms)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.max_concurrent_calls == 0 {
            return Err(ConfigurationError::invalid_value(
                "orchestration.max_concurrent_calls",
                self.max_concurrent_calls,
                "must be greater than 0",
            ));
        }
        if self.worker_pool_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "orchestration.worker_pool_size",
                self.worker_pool_size,
                "must be greater than 0",
            ));
        }
        if self.operation_timeout_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "orchestration.operation_timeout_seconds",
                self.operation_timeout_seconds,
                "must be greater than 0",
            ));
        }
        if self.progress_callback_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "orchestration.progress_callback_timeout_ms",
                self.progress_callback_timeout_ms,
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: defaults::MAX_CONCURRENT_CALLS,
            worker_pool_size: defaults::WORKER_POOL_SIZE,
            operation_timeout_seconds: defaults::OPERATION_TIMEOUT_SECONDS,
            progress_callback_timeout_ms: defaults::PROGRESS_CALLBACK_TIMEOUT_MS,
            news_days_back: defaults::NEWS_DAYS_BACK,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Delay before the retry following `retry_count` failed retries
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        let exponent = i32::try_from(retry_count).unwrap_or(i32::MAX);
        let delay_ms = self.base_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_millis(delay_ms.min(self.max_delay_ms as f64) as u64)
    }

    /// Upper bound for any single wait between attempts
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.backoff_multiplier.is_nan() || self.backoff_multiplier < 1.0 {
            return Err(ConfigurationError::invalid_value(
                "retry.backoff_multiplier",
                self.backoff_multiplier,
                "must be at least 1.0",
            ));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(ConfigurationError::invalid_value(
                "retry.max_delay_ms",
                self.max_delay_ms,
                "must not be smaller than retry.base_delay_ms",
            ));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: defaults::MAX_RETRIES,
            base_delay_ms: defaults::RETRY_BASE_DELAY_MS,
            max_delay_ms: defaults::RETRY_MAX_DELAY_MS,
            backoff_multiplier: defaults::RETRY_BACKOFF_MULTIPLIER,
        }
    }
}

/// Circuit breaker thresholds shared by every dependency, with optional
/// per-dependency overrides
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub cooldown_seconds: u64,
    pub component_overrides: HashMap<String, CircuitBreakerOverride>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CircuitBreakerOverride {
    pub failure_threshold: Option<u32>,
    pub cooldown_seconds: Option<u64>,
}

impl CircuitBreakerSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }

    /// Effective breaker configuration for a dependency
    pub fn config_for_component(&self, component: &str) -> CircuitBreakerConfig {
        let component_override = self.component_overrides.get(component);
        let failure_threshold = component_override
            .and_then(|o| o.failure_threshold)
            .unwrap_or(self.failure_threshold);
        let cooldown_seconds = component_override
            .and_then(|o| o.cooldown_seconds)
            .unwrap_or(self.cooldown_seconds);

        CircuitBreakerConfig {
            failure_threshold,
            cooldown: Duration::from_secs(cooldown_seconds),
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.failure_threshold == 0 {
            return Err(ConfigurationError::invalid_value(
                "circuit_breakers.failure_threshold",
                self.failure_threshold,
                "must be greater than 0",
            ));
        }
        for (component, component_override) in &self.component_overrides {
            if component_override.failure_threshold == Some(0) {
                return Err(ConfigurationError::invalid_value(
                    format!("circuit_breakers.component_overrides.{component}.failure_threshold"),
                    0,
                    "must be greater than 0",
                ));
            }
        }
        Ok(())
    }
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: defaults::CIRCUIT_FAILURE_THRESHOLD,
            cooldown_seconds: defaults::CIRCUIT_COOLDOWN_SECONDS,
            component_overrides: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Samples retained per (dependency, operation)
    pub max_samples: usize,
    /// Default lookback for summary queries
    pub summary_window_hours: u64,
}

impl PerformanceConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.max_samples == 0 {
            return Err(ConfigurationError::invalid_value(
                "performance.max_samples",
                self.max_samples,
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_samples: defaults::PERFORMANCE_MAX_SAMPLES,
            summary_window_hours: defaults::PERFORMANCE_WINDOW_HOURS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub openrouter_api_key: Option<String>,
    pub news_api_key: Option<String>,
    pub brandfetch_api_key: Option<String>,
    pub screenshot_api_key: Option<String>,
}

impl CredentialsConfig {
    pub(crate) fn is_present(value: &Option<String>) -> bool {
        value.as_deref().is_some_and(|key| !key.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AuditConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.orchestration.max_concurrent_calls, 3);
        assert_eq!(config.orchestration.worker_pool_size, 4);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.circuit_breakers.failure_threshold, 5);
        assert_eq!(config.circuit_breakers.cooldown(), Duration::from_secs(300));
        assert_eq!(config.performance.max_samples, 100);
    }

    #[test]
    fn test_backoff_delay_grows_and_caps() {
        let retry = RetryConfig::default();
        assert_eq!(retry.backoff_delay(0), Duration::from_secs(1));
        assert_eq!(retry.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(retry.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(retry.backoff_delay(10), Duration::from_secs(30));
    }

    #[test]
    fn test_component_override_applies() {
        let mut settings = CircuitBreakerSettings::default();
        settings.component_overrides.insert(
            "llm".to_string(),
            CircuitBreakerOverride {
                failure_threshold: Some(2),
                cooldown_seconds: None,
            },
        );

        let llm = settings.config_for_component("llm");
        assert_eq!(llm.failure_threshold, 2);
        assert_eq!(llm.cooldown, Duration::from_secs(300));

        let news = settings.config_for_component("news");
        assert_eq!(news.failure_threshold, 5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AuditConfig::default();
        config.orchestration.max_concurrent_calls = 0;
        assert!(config.validate().is_err());

        let mut config = AuditConfig::default();
        config.retry.backoff_multiplier = 0.5;
        assert!(config.validate().is_err());

        let mut config = AuditConfig::default();
        config.retry.backoff_multiplier = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = AuditConfig::default();
        config.circuit_breakers.failure_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_credentials_are_absent() {
        assert!(!CredentialsConfig::is_present(&None));
        assert!(!CredentialsConfig::is_present(&Some("  ".to_string())));
        assert!(CredentialsConfig::is_present(&Some("sk-123".to_string())));
    }
}
