use crate::metrics::backend::{MetricsBackend, RunOutcome};

/// No-op metrics backend that compiles to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_pod_created(&self) {}

    #[inline(always)]
    fn record_run_completed(&self, _: RunOutcome, _: u64) {}

    #[inline(always)]
    fn record_retry(&self) {}

    #[inline(always)]
    fn record_reconcile_error(&self, _: &str) {}
}
