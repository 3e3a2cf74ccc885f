//! # Performance Recorder
//!
//! Rolling latency/success history per `(dependency, operation)`. Each key
//! keeps a bounded FIFO buffer; the oldest sample is evicted once the buffer
//! is full. Summary queries filter by a lookback window without deleting
//! anything, so eviction stays purely capacity-driven.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

/// Identifies one monitored operation of one dependency
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetricKey {
    pub dependency: String,
    pub operation: String,
}

impl MetricKey {
    pub fn new(dependency: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            dependency: dependency.into(),
            operation: operation.into(),
        }
    }
}

impl std::fmt::Display for MetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.dependency, self.operation)
    }
}

/// A single recorded call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    pub timestamp: DateTime<Utc>,
    pub duration: Duration,
    pub success: bool,
}

/// Aggregates over the samples inside a lookback window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub sample_count: usize,
    pub average_duration_ms: f64,
    pub min_duration_ms: f64,
    pub max_duration_ms: f64,
    /// 0.0 to 1.0
    pub success_rate: f64,
}

impl PerformanceStats {
    fn from_samples<'a>(samples: impl Iterator<Item = &'a PerformanceSample>) -> Option<Self> {
        let mut count = 0usize;
        let mut successes = 0usize;
        let mut total_ms = 0.0;
        let mut min_ms = f64::MAX;
        let mut max_ms = 0.0f64;

        for sample in samples {
            let ms = sample.duration.as_secs_f64() * 1000.0;
            count += 1;
            total_ms += ms;
            min_ms = min_ms.min(ms);
            max_ms = max_ms.max(ms);
            if sample.success {
                successes += 1;
            }
        }

        if count == 0 {
            return None;
        }

        Some(Self {
            sample_count: count,
            average_duration_ms: total_ms / count as f64,
            min_duration_ms: min_ms,
            max_duration_ms: max_ms,
            success_rate: successes as f64 / count as f64,
        })
    }
}

/// Process-wide performance store. Insertions for one key are atomic with
/// respect to each other; different keys never contend.
#[derive(Debug)]
pub struct PerformanceRecorder {
    samples: DashMap<MetricKey, VecDeque<PerformanceSample>>,
    capacity: usize,
}

impl PerformanceRecorder {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record a sample stamped with the current time
    pub fn record(&self, key: &MetricKey, duration: Duration, success: bool) {
        self.record_at(key, Utc::now(), duration, success);
    }

    /// Record a sample with an explicit timestamp
    pub fn record_at(
        &self,
        key: &MetricKey,
        timestamp: DateTime<Utc>,
        duration: Duration,
        success: bool,
    ) {
        let mut buffer = self.samples.entry(key.clone()).or_default();
        if buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(PerformanceSample {
            timestamp,
            duration,
            success,
        });
    }

    /// Samples currently retained for a key, oldest first
    pub fn samples(&self, key: &MetricKey) -> Vec<PerformanceSample> {
        self.samples
            .get(key)
            .map(|buffer| buffer.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Stats for one key over the last `window_hours`
    pub fn stats(&self, key: &MetricKey, window_hours: u64) -> Option<PerformanceStats> {
        let cutoff = Self::cutoff(window_hours);
        self.samples.get(key).and_then(|buffer| {
            PerformanceStats::from_samples(buffer.iter().filter(|s| s.timestamp >= cutoff))
        })
    }

    /// Stats keyed by `"dependency.operation"`, optionally limited to one
    /// dependency. Keys with no samples inside the window are omitted.
    pub fn summary(
        &self,
        dependency: Option<&str>,
        window_hours: u64,
    ) -> BTreeMap<String, PerformanceStats> {
        let cutoff = Self::cutoff(window_hours);

        self.samples
            .iter()
            .filter(|entry| dependency.map_or(true, |dep| entry.key().dependency == dep))
            .filter_map(|entry| {
                PerformanceStats::from_samples(
                    entry.value().iter().filter(|s| s.timestamp >= cutoff),
                )
                .map(|stats| (entry.key().to_string(), stats))
            })
            .collect()
    }

    fn cutoff(window_hours: u64) -> DateTime<Utc> {
        let hours = i64::try_from(window_hours).unwrap_or(i64::MAX);
        chrono::Duration::try_hours(hours)
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl Default for PerformanceRecorder {
    fn default() -> Self {
        Self::new(crate::constants::defaults::PERFORMANCE_MAX_SAMPLES)
    }
}
