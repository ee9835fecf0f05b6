use std::sync::Arc;

/// How a run reached its terminal condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every step exited zero.
    Success,
    /// A step failed or the run could not be resolved.
    Failure,
    /// Cancelled on request.
    Cancelled,
    /// Ran out of time with no retries left.
    Timeout,
}

impl RunOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            RunOutcome::Success => "success",
            RunOutcome::Failure => "failure",
            RunOutcome::Cancelled => "cancelled",
            RunOutcome::Timeout => "timeout",
        }
    }
}

/// Backend metrics collection interface.
///
/// Implementations are injected via [`crate::reconciler::ReconcilerContext`] and shared
/// by every reconcile call.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Record that a pod was submitted for a run.
    fn record_pod_created(&self);
    /// Record a run reaching a terminal condition.
    ///
    /// # Arguments
    /// - `outcome`: How the run terminated
    /// - `duration_ms`: Time from start to completion in milliseconds
    fn record_run_completed(&self, outcome: RunOutcome, duration_ms: u64);
    /// Record a failed attempt being archived and restarted.
    fn record_retry(&self);
    /// Record a transient reconcile failure handed back to the trigger.
    ///
    /// # Arguments
    /// - `error_kind`: Error category, see [`crate::error::ReconcileError::kind`]
    fn record_reconcile_error(&self, error_kind: &str);
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
