//! Tracing, logging, metrics (shared setup).

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, layers).
pub mod tracing;

/// Metrics registry (explicit gauges/counters, no process-wide statics).
pub mod metrics;

pub use metrics::MetricsRegistry;
