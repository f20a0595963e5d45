//! Shorthand for performance instrumentation.

/// Create a [`crate::performance::PerformanceSpan`] that logs its duration on drop.
///
/// ```rust
/// use limbdark_tracing::perf_span;
///
/// {
///     let _span = perf_span!("design_matrix", rows = 9, cols = 1);
///     // ... work ...
/// }
/// ```
#[macro_export]
macro_rules! perf_span {
    ($name:expr) => {{
        $crate::performance::PerformanceSpan::new($name, None)
    }};
    ($name:expr, $($field:tt = $value:expr),+ $(,)?) => {{
        $crate::debug!(perf = $name, $($field = $value),+, "perf_span_start");
        $crate::performance::PerformanceSpan::new($name, None)
    }};
}

/// Emit a debug event tagged with `event = $name`.
///
/// ```rust
/// use limbdark_tracing::perf_event;
///
/// perf_event!("engine_constructed", columns = 256, tables = 3);
/// ```
#[macro_export]
macro_rules! perf_event {
    ($name:expr, $($field:tt = $value:expr),+ $(,)?) => {
        $crate::debug!(event = $name, $($field = $value),+);
    };
}
