//! # Provider Error Classification
//!
//! Turns a provider failure into an [`ErrorInfo`]: category, severity, the
//! recovery strategy to apply and a message fit for end users.
//!
//! ## Default policy
//!
//! | Category       | Severity | Strategy    |
//! |----------------|----------|-------------|
//! | network        | medium   | retry       |
//! | timeout        | medium   | retry       |
//! | rate_limit     | high     | fallback    |
//! | authentication | critical | user_action |
//! | validation     | low      | degrade     |
//! | unknown        | high     | fail        |
//!
//! A call site may override the strategy through
//! [`ErrorContext::strategy_override`]. Unstructured errors
//! ([`ProviderError::Other`]) are categorized from their message.

use crate::providers::ProviderError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Primary error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Connectivity problem - may succeed on retry
    Network,
    /// Operation exceeded its deadline - may succeed on retry
    Timeout,
    /// Upstream quota exhausted
    RateLimit,
    /// Missing or rejected credentials
    Authentication,
    /// Response did not have the expected shape
    Validation,
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Timeout => write!(f, "timeout"),
            ErrorCategory::RateLimit => write!(f, "rate_limit"),
            ErrorCategory::Authentication => write!(f, "authentication"),
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Whether a failure of this severity advances the circuit breaker
    pub fn counts_toward_circuit(self) -> bool {
        matches!(self, ErrorSeverity::High | ErrorSeverity::Critical)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    /// Call the operation again after a backoff delay
    Retry,
    /// Use the provider registered for the operation
    Fallback,
    /// Synthesize a reduced-fidelity result locally
    Degrade,
    /// The caller has to supply missing input
    UserAction,
    /// Terminal for the operation
    Fail,
}

impl std::fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoveryStrategy::Retry => write!(f, "retry"),
            RecoveryStrategy::Fallback => write!(f, "fallback"),
            RecoveryStrategy::Degrade => write!(f, "degrade"),
            RecoveryStrategy::UserAction => write!(f, "user_action"),
            RecoveryStrategy::Fail => write!(f, "fail"),
        }
    }
}

/// Context information for error classification
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub dependency: String,
    pub operation: String,
    /// Retries already performed for this call
    pub retry_count: u32,
    pub max_retries: u32,
    pub strategy_override: Option<RecoveryStrategy>,
}

/// Classification of a single failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub strategy: RecoveryStrategy,
    pub retry_count: u32,
    pub max_retries: u32,
    /// Suitable for showing to end users
    pub user_message: String,
    /// The provider's own error text
    pub technical_message: String,
    /// Upstream hint for when to try again
    pub retry_after: Option<Duration>,
    pub dependency: String,
    pub operation: String,
    pub occurred_at: DateTime<Utc>,
}

impl ErrorInfo {
    pub fn retries_remaining(&self) -> bool {
        self.retry_count < self.max_retries
    }
}

/// Trait for error classification strategies
pub trait ErrorClassifier: Send + Sync {
    fn classify_error(&self, error: &ProviderError, context: &ErrorContext) -> ErrorInfo;

    fn classifier_name(&self) -> &'static str;
}

/// Standard classifier implementing the default policy table
#[derive(Debug, Clone, Default)]
pub struct StandardErrorClassifier;

impl StandardErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Category of an error, using message heuristics for unstructured ones
    pub fn categorize(error: &ProviderError) -> ErrorCategory {
        match error {
            ProviderError::Network(_) => ErrorCategory::Network,
            ProviderError::Timeout(_) => ErrorCategory::Timeout,
            ProviderError::RateLimited { .. } => ErrorCategory::RateLimit,
            ProviderError::Authentication(_) => ErrorCategory::Authentication,
            ProviderError::InvalidData(_) => ErrorCategory::Validation,
            ProviderError::Other(e) => Self::categorize_message(&e.to_string()),
        }
    }

    fn categorize_message(message: &str) -> ErrorCategory {
        let message = message.to_lowercase();
        let contains_any = |patterns: &[&str]| patterns.iter().any(|p| message.contains(p));

        if contains_any(&["timed out", "timeout", "deadline"]) {
            ErrorCategory::Timeout
        } else if contains_any(&["429", "rate limit", "too many requests", "quota"]) {
            ErrorCategory::RateLimit
        } else if contains_any(&[
            "401",
            "403",
            "unauthorized",
            "forbidden",
            "api key",
            "api_key",
            "credential",
        ]) {
            ErrorCategory::Authentication
        } else if contains_any(&["connection", "network", "dns", "unreachable", "reset by peer"]) {
            ErrorCategory::Network
        } else if contains_any(&["invalid", "parse", "malformed", "unexpected response", "missing field"]) {
            ErrorCategory::Validation
        } else {
            ErrorCategory::Unknown
        }
    }

    /// Default severity and strategy for a category
    pub fn default_policy(category: ErrorCategory) -> (ErrorSeverity, RecoveryStrategy) {
        match category {
            ErrorCategory::Network => (ErrorSeverity::Medium, RecoveryStrategy::Retry),
            ErrorCategory::Timeout => (ErrorSeverity::Medium, RecoveryStrategy::Retry),
            ErrorCategory::RateLimit => (ErrorSeverity::High, RecoveryStrategy::Fallback),
            ErrorCategory::Authentication => {
                (ErrorSeverity::Critical, RecoveryStrategy::UserAction)
            }
            ErrorCategory::Validation => (ErrorSeverity::Low, RecoveryStrategy::Degrade),
            ErrorCategory::Unknown => (ErrorSeverity::High, RecoveryStrategy::Fail),
        }
    }

    fn user_message(category: ErrorCategory, dependency: &str) -> String {
        match category {
            ErrorCategory::Network => {
                format!("Could not reach the {dependency} service. Please try again shortly.")
            }
            ErrorCategory::Timeout => {
                format!("The {dependency} service took too long to respond.")
            }
            ErrorCategory::RateLimit => {
                format!("The {dependency} service is receiving too many requests right now.")
            }
            ErrorCategory::Authentication => format!(
                "The {dependency} service rejected our credentials. Check that its API key is configured."
            ),
            ErrorCategory::Validation => {
                format!("The {dependency} service returned data we could not use.")
            }
            ErrorCategory::Unknown => {
                format!("An unexpected error occurred while contacting the {dependency} service.")
            }
        }
    }
}

impl ErrorClassifier for StandardErrorClassifier {
    fn classify_error(&self, error: &ProviderError, context: &ErrorContext) -> ErrorInfo {
        let category = Self::categorize(error);
        let (severity, default_strategy) = Self::default_policy(category);
        let retry_after = match error {
            ProviderError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        };

        ErrorInfo {
            category,
            severity,
            strategy: context.strategy_override.unwrap_or(default_strategy),
            retry_count: context.retry_count,
            max_retries: context.max_retries,
            user_message: Self::user_message(category, &context.dependency),
            technical_message: error.to_string(),
            retry_after,
            dependency: context.dependency.clone(),
            operation: context.operation.clone(),
            occurred_at: Utc::now(),
        }
    }

    fn classifier_name(&self) -> &'static str {
        "standard"
    }
}
