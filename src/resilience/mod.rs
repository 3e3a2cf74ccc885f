//! # Resilience Module
//!
//! Fault isolation for the external dependencies an analysis run talks to.
//!
//! ## Architecture
//!
//! - **Circuit Breakers**: stop calling a dependency that keeps failing with
//!   high or critical severity, for a cool-down window
//! - **Manager**: process-wide registry of breakers keyed by dependency name
//! - **Metrics**: per-breaker counters and a system health score
//!
//! ## Usage
//!
//! ```rust,no_run
//! use brand_audit_core::resilience::{CircuitBreaker, CircuitBreakerConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CircuitBreakerConfig {
//!     failure_threshold: 5,
//!     cooldown: Duration::from_secs(300),
//! };
//!
//! let circuit_breaker = CircuitBreaker::new("news".to_string(), config);
//!
//! let result = circuit_breaker
//!     .call(|| async { Ok::<&str, String>("articles") }, |_| true)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod circuit_breaker;
pub mod config;
pub mod manager;
pub mod metrics;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitBreakerState, CircuitState};
pub use config::CircuitBreakerConfig;
pub use manager::CircuitBreakerManager;
pub use metrics::{CircuitBreakerMetrics, SystemCircuitBreakerMetrics};
