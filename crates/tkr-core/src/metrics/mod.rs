//! Metrics collection abstraction for the reconciler.
//!
//! Backends (prometheus, statsd, etc) implement [`MetricsBackend`] and are injected via
//! [`crate::reconciler::ReconcilerContext`].
mod backend;
pub use backend::{MetricsBackend, MetricsHandle, RunOutcome};

mod noop;
pub use noop::NoOpMetrics;

use std::sync::Arc;

/// Create a no-op metrics handle.
#[inline]
pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}
