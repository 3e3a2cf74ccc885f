//! # Circuit Breaker Metrics
//!
//! Counters kept by each circuit breaker and a system-wide aggregate used by
//! monitoring surfaces.

use crate::resilience::CircuitState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Metrics for a single circuit breaker instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerMetrics {
    /// Calls that reached the protected operation
    pub total_calls: u64,

    pub success_count: u64,

    pub failure_count: u64,

    /// Calls rejected without invoking the operation
    pub short_circuited_calls: u64,

    /// Number of closed/half-open to open transitions
    pub times_opened: u64,

    /// Counted failures since the last success
    pub failure_streak: u32,

    pub total_duration: Duration,

    pub current_state: CircuitState,

    /// 0.0 to 1.0
    pub failure_rate: f64,

    /// 0.0 to 1.0
    pub success_rate: f64,

    pub average_duration: Duration,
}

impl CircuitBreakerMetrics {
    /// Create new metrics instance with zero values
    pub fn new() -> Self {
        Self {
            total_calls: 0,
            success_count: 0,
            failure_count: 0,
            short_circuited_calls: 0,
            times_opened: 0,
            failure_streak: 0,
            total_duration: Duration::ZERO,
            current_state: CircuitState::Closed,
            failure_rate: 0.0,
            success_rate: 0.0,
            average_duration: Duration::ZERO,
        }
    }

    /// Check if metrics indicate healthy operation
    pub fn is_healthy(&self) -> bool {
        match self.current_state {
            CircuitState::Closed => self.failure_rate < 0.5,
            CircuitState::Open => false,
            CircuitState::HalfOpen => true,
        }
    }

    /// Human-readable state description
    pub fn state_description(&self) -> &'static str {
        match self.current_state {
            CircuitState::Closed => "Healthy - Normal operation",
            CircuitState::Open => "Failing - Rejecting all calls",
            CircuitState::HalfOpen => "Recovering - Testing dependency health",
        }
    }

    /// Format metrics for logging
    pub fn format_summary(&self) -> String {
        format!(
            "State: {} | Calls: {} | Success: {:.1}% | Failures: {} | Short-circuited: {} | Avg Duration: {}ms",
            self.state_description(),
            self.total_calls,
            self.success_rate * 100.0,
            self.failure_count,
            self.short_circuited_calls,
            self.average_duration.as_millis()
        )
    }
}

impl Default for CircuitBreakerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// System-wide circuit breaker metrics aggregator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemCircuitBreakerMetrics {
    /// Metrics for individual circuit breakers by name
    pub circuit_breakers: HashMap<String, CircuitBreakerMetrics>,

    pub collected_at: chrono::DateTime<chrono::Utc>,
}

impl SystemCircuitBreakerMetrics {
    pub fn new() -> Self {
        Self {
            circuit_breakers: HashMap::new(),
            collected_at: chrono::Utc::now(),
        }
    }

    pub fn add_circuit_breaker(&mut self, name: String, metrics: CircuitBreakerMetrics) {
        self.circuit_breakers.insert(name, metrics);
        self.collected_at = chrono::Utc::now();
    }

    /// Count of circuit breakers by state
    pub fn count_by_state(&self) -> HashMap<CircuitState, usize> {
        let mut counts = HashMap::new();
        for metrics in self.circuit_breakers.values() {
            *counts.entry(metrics.current_state).or_insert(0) += 1;
        }
        counts
    }

    /// Names of breakers that are not healthy
    pub fn unhealthy_circuits(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .circuit_breakers
            .iter()
            .filter(|(_, metrics)| !metrics.is_healthy())
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// System-wide health score (0.0 to 1.0)
    pub fn health_score(&self) -> f64 {
        if self.circuit_breakers.is_empty() {
            return 1.0;
        }

        let healthy_count = self
            .circuit_breakers
            .values()
            .filter(|metrics| metrics.is_healthy())
            .count();

        healthy_count as f64 / self.circuit_breakers.len() as f64
    }
}

impl Default for SystemCircuitBreakerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_metrics_aggregation() {
        let mut system_metrics = SystemCircuitBreakerMetrics::new();

        let mut news = CircuitBreakerMetrics::new();
        news.total_calls = 100;
        news.success_count = 95;
        news.failure_count = 5;
        news.failure_rate = 0.05;

        let mut llm = CircuitBreakerMetrics::new();
        llm.current_state = CircuitState::Open;
        llm.total_calls = 10;
        llm.failure_count = 10;
        llm.failure_rate = 1.0;

        system_metrics.add_circuit_breaker("news".to_string(), news);
        system_metrics.add_circuit_breaker("llm".to_string(), llm);

        let counts = system_metrics.count_by_state();
        assert_eq!(counts.get(&CircuitState::Closed), Some(&1));
        assert_eq!(counts.get(&CircuitState::Open), Some(&1));
        assert_eq!(system_metrics.health_score(), 0.5);
        assert_eq!(system_metrics.unhealthy_circuits(), vec!["llm"]);
    }

    #[test]
    fn test_empty_system_is_healthy() {
        assert_eq!(SystemCircuitBreakerMetrics::new().health_score(), 1.0);
    }
}
