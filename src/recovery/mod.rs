//! # Retry and Recovery
//!
//! Classification of provider failures and the policy engine that decides,
//! per failure, whether to retry, fall back, degrade, ask the user or give up.

pub mod error_classifier;
pub mod fallback;
pub mod service;

pub use error_classifier::{
    ErrorCategory, ErrorClassifier, ErrorContext, ErrorInfo, ErrorSeverity, RecoveryStrategy,
    StandardErrorClassifier,
};
pub use fallback::{FallbackProvider, FallbackRegistry, FnFallback};
pub use service::{DegradeFn, ErrorManagementService, Recovered, RecoveryContext, RecoveryFailure};
