//! Timing spans for operator calls.
//!
//! ```rust
//! use limbdark_tracing::performance::PerformanceSpan;
//!
//! {
//!     let _span = PerformanceSpan::new("design_matrix", Some(100));
//!     // ... work ...
//! } // logged only if the block took at least 100µs
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Process-wide threshold applied to spans created without an explicit one.
/// Zero logs everything.
static DEFAULT_THRESHOLD_US: AtomicU64 = AtomicU64::new(0);

/// Set the threshold used by spans that do not carry their own.
///
/// `None` logs every span; `Some(u64::MAX)` effectively disables them.
pub fn set_threshold(threshold_us: Option<u64>) {
    DEFAULT_THRESHOLD_US.store(threshold_us.unwrap_or(0), Ordering::Relaxed);
}

/// Current process-wide threshold in microseconds.
pub fn threshold() -> u64 {
    DEFAULT_THRESHOLD_US.load(Ordering::Relaxed)
}

/// RAII timer that logs its duration on drop when it exceeds the threshold.
pub struct PerformanceSpan {
    name: String,
    threshold_us: u64,
    start_time: Instant,
    span: tracing::Span,
}

impl PerformanceSpan {
    /// Start timing `name`. `threshold_us` overrides the process-wide threshold.
    pub fn new(name: impl Into<String>, threshold_us: Option<u64>) -> Self {
        let name = name.into();
        let span = tracing::debug_span!("perf", name = %name);
        Self {
            name,
            threshold_us: threshold_us.unwrap_or_else(threshold),
            start_time: Instant::now(),
            span,
        }
    }

    /// Name given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Microseconds since the span started.
    pub fn elapsed_us(&self) -> u64 {
        self.start_time.elapsed().as_micros() as u64
    }

    /// Enter the underlying `tracing` span.
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for PerformanceSpan {
    fn drop(&mut self) {
        let elapsed_us = self.elapsed_us();
        if elapsed_us >= self.threshold_us {
            let _entered = self.span.enter();
            tracing::debug!(
                duration_us = elapsed_us,
                duration_ms = elapsed_us as f64 / 1000.0,
                "performance_span_complete"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_explicit_threshold_wins_over_default() {
        set_threshold(Some(10));
        let span = PerformanceSpan::new("explicit", Some(3));
        assert_eq!(span.threshold_us, 3);
        set_threshold(None);
    }

    #[test]
    #[serial]
    fn test_default_threshold_is_picked_up() {
        set_threshold(Some(42));
        let span = PerformanceSpan::new("inherited", None);
        assert_eq!(span.threshold_us, 42);
        assert_eq!(span.name(), "inherited");
        set_threshold(None);
        assert_eq!(threshold(), 0);
    }
}
