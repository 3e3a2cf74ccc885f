//! # Metrics
//!
//! Performance history for external dependency calls.

pub mod performance;

pub use performance::{MetricKey, PerformanceRecorder, PerformanceSample, PerformanceStats};
