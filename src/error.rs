//! Error types for the brand audit core.

use crate::config::ConfigurationError;
use crate::providers::ProviderError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrandAuditError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("Orchestration error: {0}")]
    OrchestrationError(String),
    #[error("Progress callback error: {0}")]
    ProgressCallback(String),
    #[error("{component} is temporarily unavailable, retry after {} seconds", retry_after.as_secs())]
    CircuitOpen {
        component: String,
        retry_after: Duration,
    },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for BrandAuditError {
    fn from(error: serde_json::Error) -> Self {
        BrandAuditError::ValidationError(format!("JSON serialization error: {error}"))
    }
}

pub type Result<T> = std::result::Result<T, BrandAuditError>;
