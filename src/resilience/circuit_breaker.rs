//! # Circuit Breaker Implementation
//!
//! Per-dependency fault isolation with three states: Closed (normal
//! operation), Open (failing fast for a cool-down window) and Half-Open (a
//! single probe call decides whether to close or re-open).
//!
//! Only failures the caller marks as counted (high or critical severity in the
//! recovery engine) advance the failure count while closed. Any success resets
//! the count and closes the circuit.

use crate::resilience::{CircuitBreakerConfig, CircuitBreakerMetrics};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed,
    /// Failure mode - all calls fail fast without executing
    Open,
    /// Testing recovery - exactly one probe call is allowed through
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Externally visible breaker record for a dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerState {
    pub state: CircuitState,
    pub failure_count: u32,
    pub next_attempt_time: Option<DateTime<Utc>>,
}

/// Errors that can occur during circuit breaker operation
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open, rejecting all calls
    #[error("{component} is temporarily unavailable, retry after {} seconds", retry_after.as_secs())]
    CircuitOpen {
        component: String,
        retry_after: Duration,
    },

    /// Operation failed and was recorded
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
    next_attempt_time: Option<DateTime<Utc>>,
    probe_in_flight: bool,
    metrics: CircuitBreakerMetrics,
}

/// Circuit breaker guarding a single dependency
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Component name for logging and metrics
    name: String,

    config: CircuitBreakerConfig,

    /// State, counters and timestamps change together under one lock
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given name and configuration
    pub fn new(name: String, config: CircuitBreakerConfig) -> Self {
        info!(
            component = %name,
            failure_threshold = config.failure_threshold,
            cooldown_seconds = config.cooldown.as_secs(),
            "🛡️ Circuit breaker initialized"
        );

        Self {
            name,
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                opened_at: None,
                next_attempt_time: None,
                probe_in_flight: false,
                metrics: CircuitBreakerMetrics::new(),
            }),
        }
    }

    /// Current circuit state
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Snapshot of the externally visible record
    pub fn snapshot(&self) -> CircuitBreakerState {
        let inner = self.inner.lock();
        CircuitBreakerState {
            state: inner.state,
            failure_count: inner.failure_count,
            next_attempt_time: inner.next_attempt_time,
        }
    }

    /// Execute an operation with circuit breaker protection.
    ///
    /// `is_counted` decides whether a failure advances the failure count.
    pub async fn call<F, T, E, Fut>(
        &self,
        operation: F,
        is_counted: impl Fn(&E) -> bool,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Err(retry_after) = self.try_acquire() {
            return Err(CircuitBreakerError::CircuitOpen {
                component: self.name.clone(),
                retry_after,
            });
        }

        let start_time = Instant::now();
        let result = operation().await;
        let duration = start_time.elapsed();

        match &result {
            Ok(_) => self.record_success(duration),
            Err(e) => self.record_failure(duration, is_counted(e)),
        }

        result.map_err(CircuitBreakerError::OperationFailed)
    }

    /// Ask for permission to make a call. On rejection returns how long the
    /// caller should wait before trying again.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|opened| opened.elapsed())
                    .unwrap_or(self.config.cooldown);

                if elapsed >= self.config.cooldown {
                    self.transition_to_half_open(&mut inner);
                    inner.probe_in_flight = true;
                    Ok(())
                } else {
                    inner.metrics.short_circuited_calls += 1;
                    Err(self.config.cooldown - elapsed)
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    inner.metrics.short_circuited_calls += 1;
                    Err(Duration::from_secs(1))
                } else {
                    inner.probe_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    /// Record a successful operation
    pub fn record_success(&self, duration: Duration) {
        let mut inner = self.inner.lock();
        inner.metrics.total_calls += 1;
        inner.metrics.success_count += 1;
        inner.metrics.total_duration += duration;

        debug!(
            component = %self.name,
            duration_ms = duration.as_millis() as u64,
            "🟢 Operation succeeded"
        );

        if inner.state != CircuitState::Closed {
            self.transition_to_closed(&mut inner);
        } else {
            inner.failure_count = 0;
        }
    }

    /// Record a failed operation
    pub fn record_failure(&self, duration: Duration, counted: bool) {
        let mut inner = self.inner.lock();
        inner.metrics.total_calls += 1;
        inner.metrics.failure_count += 1;
        inner.metrics.total_duration += duration;

        if counted {
            inner.failure_count += 1;
        }

        warn!(
            component = %self.name,
            duration_ms = duration.as_millis() as u64,
            counted = counted,
            failure_count = inner.failure_count,
            "🔴 Operation failed"
        );

        match inner.state {
            CircuitState::Closed => {
                if counted && inner.failure_count >= self.config.failure_threshold {
                    self.transition_to_open(&mut inner);
                }
            }
            CircuitState::HalfOpen => {
                // The probe failed
                self.transition_to_open(&mut inner);
            }
            CircuitState::Open => {}
        }
    }

    fn transition_to_closed(&self, inner: &mut BreakerInner) {
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.opened_at = None;
        inner.next_attempt_time = None;
        inner.probe_in_flight = false;

        info!(
            component = %self.name,
            total_calls = inner.metrics.total_calls,
            "🟢 Circuit breaker closed (recovered)"
        );
    }

    fn transition_to_open(&self, inner: &mut BreakerInner) {
        inner.state = CircuitState::Open;
        inner.opened_at = Some(Instant::now());
        inner.next_attempt_time = chrono::Duration::from_std(self.config.cooldown)
            .ok()
            .map(|cooldown| Utc::now() + cooldown);
        inner.probe_in_flight = false;
        inner.metrics.times_opened += 1;

        error!(
            component = %self.name,
            failure_count = inner.failure_count,
            failure_threshold = self.config.failure_threshold,
            cooldown_seconds = self.config.cooldown.as_secs(),
            "🔴 Circuit breaker opened (failing fast)"
        );
    }

    fn transition_to_half_open(&self, inner: &mut BreakerInner) {
        inner.state = CircuitState::HalfOpen;
        inner.probe_in_flight = false;

        info!(
            component = %self.name,
            "🟡 Circuit breaker half-open (testing recovery)"
        );
    }

    /// Force circuit to open state
    pub fn force_open(&self) {
        warn!(component = %self.name, "🚨 Circuit breaker forced open");
        let mut inner = self.inner.lock();
        self.transition_to_open(&mut inner);
    }

    /// Force circuit to closed state, clearing the failure count
    pub fn force_closed(&self) {
        warn!(component = %self.name, "🚨 Circuit breaker forced closed");
        let mut inner = self.inner.lock();
        self.transition_to_closed(&mut inner);
    }

    /// Current metrics snapshot
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.inner.lock();
        let mut snapshot = inner.metrics.clone();
        snapshot.current_state = inner.state;
        snapshot.failure_streak = inner.failure_count;

        if snapshot.total_calls > 0 {
            snapshot.failure_rate = snapshot.failure_count as f64 / snapshot.total_calls as f64;
            snapshot.success_rate = snapshot.success_count as f64 / snapshot.total_calls as f64;
            snapshot.average_duration = Duration::from_secs_f64(
                snapshot.total_duration.as_secs_f64() / snapshot.total_calls as f64,
            );
        }

        snapshot
    }

    /// Component name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }
}
