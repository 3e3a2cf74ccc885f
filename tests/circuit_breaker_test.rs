//! Circuit breaker lifecycle and registry behavior

use brand_audit_core::config::{CircuitBreakerOverride, CircuitBreakerSettings};
use brand_audit_core::resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerManager,
    CircuitState,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
enum CallError {
    Critical,
    Minor,
}

fn is_counted(error: &CallError) -> bool {
    matches!(error, CallError::Critical)
}

fn breaker(threshold: u32, cooldown: Duration) -> CircuitBreaker {
    CircuitBreaker::new(
        "news".to_string(),
        CircuitBreakerConfig {
            failure_threshold: threshold,
            cooldown,
        },
    )
}

#[tokio::test]
async fn test_sixth_call_short_circuits_after_five_counted_failures() {
    let breaker = breaker(5, Duration::from_secs(300));
    let invocations = AtomicU32::new(0);

    for _ in 0..5 {
        let result = breaker
            .call(
                || async {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(CallError::Critical)
                },
                is_counted,
            )
            .await;
        assert!(matches!(result, Err(CircuitBreakerError::OperationFailed(_))));
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    let result = breaker
        .call(
            || async {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CallError>(())
            },
            is_counted,
        )
        .await;

    match result {
        Err(CircuitBreakerError::CircuitOpen {
            component,
            retry_after,
        }) => {
            assert_eq!(component, "news");
            assert!(retry_after > Duration::from_secs(290));
        }
        other => panic!("expected short circuit, got {other:?}"),
    }
    assert_eq!(invocations.load(Ordering::SeqCst), 5);
    assert_eq!(breaker.metrics().short_circuited_calls, 1);
}

#[tokio::test]
async fn test_half_open_probe_success_resets_failure_count() {
    let breaker = breaker(2, Duration::from_millis(30));

    for _ in 0..2 {
        let _ = breaker
            .call(|| async { Err::<(), _>(CallError::Critical) }, is_counted)
            .await;
    }
    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(breaker.snapshot().failure_count, 2);

    tokio::time::sleep(Duration::from_millis(50)).await;

    let result = breaker
        .call(|| async { Ok::<_, CallError>("probe") }, is_counted)
        .await;
    assert!(matches!(result, Ok("probe")));

    let snapshot = breaker.snapshot();
    assert_eq!(snapshot.state, CircuitState::Closed);
    assert_eq!(snapshot.failure_count, 0);
    assert!(snapshot.next_attempt_time.is_none());
}

#[tokio::test]
async fn test_half_open_failure_reopens() {
    let breaker = breaker(1, Duration::from_millis(20));

    let _ = breaker
        .call(|| async { Err::<(), _>(CallError::Critical) }, is_counted)
        .await;
    tokio::time::sleep(Duration::from_millis(40)).await;

    // Even an uncounted failure ends the probe
    let _ = breaker
        .call(|| async { Err::<(), _>(CallError::Minor) }, is_counted)
        .await;

    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(breaker.metrics().times_opened, 2);
}

#[test]
fn test_half_open_admits_a_single_probe() {
    let breaker = breaker(1, Duration::from_millis(1));
    breaker.try_acquire().unwrap();
    breaker.record_failure(Duration::from_millis(1), true);
    std::thread::sleep(Duration::from_millis(5));

    assert!(breaker.try_acquire().is_ok());
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
    assert!(breaker.try_acquire().is_err());
}

#[tokio::test]
async fn test_uncounted_failures_never_open() {
    let breaker = breaker(2, Duration::from_secs(300));

    for _ in 0..20 {
        let _ = breaker
            .call(|| async { Err::<(), _>(CallError::Minor) }, is_counted)
            .await;
    }

    assert_eq!(breaker.state(), CircuitState::Closed);
    let metrics = breaker.metrics();
    assert_eq!(metrics.failure_count, 20);
    assert_eq!(metrics.failure_streak, 0);
}

#[test]
fn test_manager_applies_component_overrides() {
    let settings = CircuitBreakerSettings {
        component_overrides: HashMap::from([(
            "llm".to_string(),
            CircuitBreakerOverride {
                failure_threshold: Some(2),
                cooldown_seconds: None,
            },
        )]),
        ..CircuitBreakerSettings::default()
    };
    let manager = CircuitBreakerManager::new(settings);

    let llm = manager.get_circuit_breaker("llm");
    let news = manager.get_circuit_breaker("news");

    assert_eq!(llm.config().failure_threshold, 2);
    assert_eq!(llm.config().cooldown, Duration::from_secs(300));
    assert_eq!(news.config().failure_threshold, 5);
    assert!(Arc::ptr_eq(&news, &manager.get_circuit_breaker("news")));
    assert_eq!(manager.list_components(), vec!["llm", "news"]);
}

#[test]
fn test_manager_reset_and_health_score() {
    let manager = CircuitBreakerManager::default();
    let news = manager.get_circuit_breaker("news");
    manager.get_circuit_breaker("llm");

    news.force_open();
    assert_eq!(manager.system_health_score(), 0.5);
    assert_eq!(
        manager.get_system_metrics().unhealthy_circuits(),
        vec!["news"]
    );

    assert!(manager.reset("news"));
    assert!(!manager.reset("visual"));
    assert_eq!(news.state(), CircuitState::Closed);
    assert_eq!(manager.system_health_score(), 1.0);
}

#[tokio::test]
async fn test_concurrent_failures_are_counted_atomically() {
    let manager = CircuitBreakerManager::default();
    let mut handles = Vec::new();

    for _ in 0..4 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            let breaker = manager.get_circuit_breaker("campaigns");
            breaker.try_acquire().ok();
            breaker.record_failure(Duration::from_millis(1), true);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let breaker = manager.get_circuit_breaker("campaigns");
    assert_eq!(breaker.snapshot().failure_count, 4);
    assert_eq!(breaker.state(), CircuitState::Closed);
}
