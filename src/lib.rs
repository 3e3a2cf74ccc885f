#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Brand Audit Core
//!
//! Concurrent orchestration of a multi-source brand analysis.
//!
//! ## Overview
//!
//! A brand analysis gathers company info, press coverage and marketing
//! campaigns, then enriches them with LLM insights and visual analysis. The
//! upstream services are slow and unreliable, so every call is wrapped in the
//! same resilience stack: per-dependency circuit breakers, classified retry
//! and fallback policies, a per-attempt timeout and rolling performance
//! history. A failing stage is reported alongside the stages that succeeded.
//!
//! ## Module Organization
//!
//! - [`orchestration`] - Analysis orchestrator, batch executor, worker pool and progress
//! - [`recovery`] - Error classification and the retry/fallback/degrade policy engine
//! - [`resilience`] - Circuit breakers and their registry
//! - [`metrics`] - Performance history per dependency operation
//! - [`providers`] - Data source interfaces and payload types
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use brand_audit_core::config::ConfigManager;
//! use brand_audit_core::orchestration::{
//!     AnalysisOptions, AnalysisOrchestrator, AnalysisProviders, AnalysisRequest,
//! };
//!
//! # async fn example(providers: AnalysisProviders) -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigManager::load()?;
//! brand_audit_core::logging::init_structured_logging(&config.config().logging);
//!
//! let orchestrator = AnalysisOrchestrator::new(config, providers);
//! let request = AnalysisRequest::new(
//!     "Tesla",
//!     Some("https://tesla.com".to_string()),
//!     AnalysisOptions::all(),
//! )?;
//!
//! let result = orchestrator.run_concurrent_analysis(&request, None).await;
//! println!("{}", serde_json::to_string_pretty(&result)?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestration;
pub mod providers;
pub mod recovery;
pub mod resilience;

pub use config::{AuditConfig, ConfigManager, ConfigurationError};
pub use error::{BrandAuditError, Result};
pub use orchestration::{
    AnalysisOptions, AnalysisOrchestrator, AnalysisProviders, AnalysisRequest, AnalysisResult,
    FnProgressCallback, ProgressCallback, Stage, StageOutcome, StagePayload,
};
pub use providers::ProviderError;
pub use recovery::{ErrorCategory, RecoveryStrategy};
pub use resilience::{CircuitBreakerManager, CircuitState};
