//! # Circuit Breaker Manager
//!
//! Registry of circuit breakers keyed by dependency name. Breakers are created
//! lazily on first use and shared by every analysis run that holds the
//! manager.

use crate::config::CircuitBreakerSettings;
use crate::resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitBreakerState,
    CircuitState, SystemCircuitBreakerMetrics,
};
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

/// Manager for the circuit breakers of every external dependency
#[derive(Debug, Clone)]
pub struct CircuitBreakerManager {
    circuit_breakers: Arc<DashMap<String, Arc<CircuitBreaker>>>,
    settings: CircuitBreakerSettings,
}

impl CircuitBreakerManager {
    pub fn new(settings: CircuitBreakerSettings) -> Self {
        info!(
            failure_threshold = settings.failure_threshold,
            cooldown_seconds = settings.cooldown_seconds,
            overrides = settings.component_overrides.len(),
            "Initializing circuit breaker manager"
        );

        Self {
            circuit_breakers: Arc::new(DashMap::new()),
            settings,
        }
    }

    /// Get or create the circuit breaker for a dependency
    pub fn get_circuit_breaker(&self, component_name: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.circuit_breakers.get(component_name) {
            return Arc::clone(breaker.value());
        }

        let entry = self
            .circuit_breakers
            .entry(component_name.to_string())
            .or_insert_with(|| {
                let config = self.component_config(component_name);
                Arc::new(CircuitBreaker::new(component_name.to_string(), config))
            });

        Arc::clone(entry.value())
    }

    fn component_config(&self, component_name: &str) -> CircuitBreakerConfig {
        let config = self.settings.config_for_component(component_name);
        match config.validate() {
            Ok(()) => config,
            Err(reason) => {
                warn!(
                    component = component_name,
                    reason = %reason,
                    "Invalid circuit breaker configuration, using defaults"
                );
                CircuitBreakerConfig::default()
            }
        }
    }

    /// Names of all known dependencies
    pub fn list_components(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .circuit_breakers
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Externally visible state of every known breaker
    pub fn status(&self) -> BTreeMap<String, CircuitBreakerState> {
        self.circuit_breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().snapshot()))
            .collect()
    }

    pub fn get_component_metrics(&self, component_name: &str) -> Option<CircuitBreakerMetrics> {
        self.circuit_breakers
            .get(component_name)
            .map(|breaker| breaker.metrics())
    }

    pub fn get_system_metrics(&self) -> SystemCircuitBreakerMetrics {
        let mut system_metrics = SystemCircuitBreakerMetrics::new();
        for entry in self.circuit_breakers.iter() {
            system_metrics.add_circuit_breaker(entry.key().clone(), entry.value().metrics());
        }
        system_metrics
    }

    pub fn get_state_summary(&self) -> HashMap<CircuitState, usize> {
        self.get_system_metrics().count_by_state()
    }

    pub fn system_health_score(&self) -> f64 {
        self.get_system_metrics().health_score()
    }

    /// Close a dependency's breaker and clear its failure count. Returns
    /// false when the dependency has no breaker yet.
    pub fn reset(&self, component_name: &str) -> bool {
        match self.circuit_breakers.get(component_name) {
            Some(breaker) => {
                breaker.force_closed();
                true
            }
            None => false,
        }
    }

    /// Force close all circuit breakers
    pub fn force_close_all(&self) {
        warn!("🚨 Forcing all circuit breakers closed");
        for entry in self.circuit_breakers.iter() {
            entry.value().force_closed();
        }
    }
}

impl Default for CircuitBreakerManager {
    fn default() -> Self {
        Self::new(CircuitBreakerSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_get_or_create_circuit_breaker() {
        let manager = CircuitBreakerManager::default();

        let breaker1 = manager.get_circuit_breaker("news");
        let breaker2 = manager.get_circuit_breaker("news");
        assert!(Arc::ptr_eq(&breaker1, &breaker2));

        assert_eq!(manager.list_components(), vec!["news".to_string()]);
        assert_eq!(manager.system_health_score(), 1.0);
    }

    #[test]
    fn test_status_reports_every_dependency() {
        let manager = CircuitBreakerManager::default();
        manager.get_circuit_breaker("news");
        manager.get_circuit_breaker("llm").force_open();

        let status = manager.status();
        assert_eq!(status.len(), 2);
        assert_eq!(status["news"].state, CircuitState::Closed);
        assert_eq!(status["llm"].state, CircuitState::Open);
        assert!(status["llm"].next_attempt_time.is_some());

        let summary = manager.get_state_summary();
        assert_eq!(summary.get(&CircuitState::Open), Some(&1));
    }

    #[test]
    fn test_overrides_and_reset() {
        let mut settings = CircuitBreakerSettings::default();
        settings.component_overrides.insert(
            "visual".to_string(),
            crate::config::CircuitBreakerOverride {
                failure_threshold: Some(1),
                cooldown_seconds: Some(10),
            },
        );
        let manager = CircuitBreakerManager::new(settings);

        let visual = manager.get_circuit_breaker("visual");
        assert_eq!(visual.config().failure_threshold, 1);
        assert_eq!(visual.config().cooldown, Duration::from_secs(10));

        visual.record_failure(Duration::from_millis(5), true);
        assert_eq!(visual.state(), CircuitState::Open);

        assert!(manager.reset("visual"));
        assert_eq!(visual.state(), CircuitState::Closed);
        assert!(!manager.reset("unknown"));
    }
}
