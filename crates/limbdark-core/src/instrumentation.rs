//! Counters and per-call metrics for operator instances
//!
//! Every operator instance owns an [`OpMetrics`]. The counters are the
//! observable side of the lifecycle rules: how many times the engine was
//! built or released, how many calls ran, how many failed. They are plain
//! relaxed atomics, so reading them never blocks a call in flight.
//!
//! ```text
//! use limbdark_core::instrumentation::{CallMetrics, OpMetrics};
//!
//! let metrics = OpMetrics::new();
//! metrics.record_call();
//! let start = std::time::Instant::now();
//! // ... compute ...
//! CallMetrics::new(shape, start).log();
//! assert_eq!(metrics.snapshot().calls, 1);
//! ```

use crate::shape::ShapeContract;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Live counters for one operator instance
#[derive(Debug, Default)]
pub struct OpMetrics {
    calls: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    engine_constructions: AtomicU64,
    engine_releases: AtomicU64,
}

impl OpMetrics {
    pub const fn new() -> Self {
        Self {
            calls: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            engine_constructions: AtomicU64::new(0),
            engine_releases: AtomicU64::new(0),
        }
    }

    pub fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_construction(&self) {
        self.engine_constructions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_release(&self) {
        self.engine_releases.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            engine_constructions: self.engine_constructions.load(Ordering::Relaxed),
            engine_releases: self.engine_releases.load(Ordering::Relaxed),
        }
    }
}

/// Serializable copy of [`OpMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub calls: u64,
    pub successes: u64,
    pub failures: u64,
    pub engine_constructions: u64,
    pub engine_releases: u64,
}

impl MetricsSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Log the counters at debug level
    pub fn log(&self) {
        tracing::debug!(
            calls = self.calls,
            successes = self.successes,
            failures = self.failures,
            engine_constructions = self.engine_constructions,
            engine_releases = self.engine_releases,
            "operator_metrics"
        );
    }
}

/// Timing of one successful design-matrix call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallMetrics {
    pub shape: ShapeContract,
    pub duration_ns: u64,
    /// Design-matrix entries written
    pub elements: usize,
}

impl CallMetrics {
    pub fn new(shape: ShapeContract, start: Instant) -> Self {
        Self {
            shape,
            duration_ns: start.elapsed().as_nanos() as u64,
            elements: shape.output_len(),
        }
    }

    /// Entries written per second
    pub fn elements_per_second(&self) -> f64 {
        if self.duration_ns == 0 {
            return 0.0;
        }
        self.elements as f64 * 1e9 / self.duration_ns as f64
    }

    pub fn log(&self) {
        tracing::debug!(
            umax = self.shape.umax(),
            nlu = self.shape.nlu(),
            n = self.shape.n(),
            duration_ns = self.duration_ns,
            elements = self.elements,
            elements_per_second = self.elements_per_second(),
            "design_matrix_computed"
        );
    }
}
