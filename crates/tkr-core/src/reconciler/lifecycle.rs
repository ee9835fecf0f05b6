//! Terminal transitions: cancellation, resolution failure, timeout and retries.
use time::OffsetDateTime;
use tkr_model::{Condition, ConditionStatus, TaskRun};
use tracing::{debug, info, warn};

use crate::{
    error::ResolveError,
    metrics::RunOutcome,
    reconciler::TaskRunReconciler,
    status::{REASON_CANCELLED, REASON_FAILED_RESOLUTION, REASON_TIMEOUT},
};

impl TaskRunReconciler {
    pub(super) async fn cancel(&self, run: &mut TaskRun, now: OffsetDateTime) {
        info!("task run cancelled");
        run.status.conditions.set(
            Condition::succeeded(
                ConditionStatus::False,
                REASON_CANCELLED,
                format!("TaskRun {:?} was cancelled", run.name()),
            ),
            now,
        );
        self.delete_pod(run).await;
        self.complete(run, RunOutcome::Cancelled, now);
    }

    pub(super) fn fail_resolution(&self, run: &mut TaskRun, err: &ResolveError, now: OffsetDateTime) {
        warn!(error = %err, "failed to resolve task run");
        run.status.conditions.set(
            Condition::succeeded(ConditionStatus::False, REASON_FAILED_RESOLUTION, err.to_string()),
            now,
        );
        self.complete(run, RunOutcome::Failure, now);
    }

    /// Handle an expired run. Returns `true` when the run timed out.
    ///
    /// A zero timeout disables the check.
    pub(super) async fn check_timeout(&self, run: &mut TaskRun, now: OffsetDateTime) -> bool {
        let timeout = run
            .spec
            .timeout
            .unwrap_or(self.ctx.config().default_timeout);
        let Some(start) = run.status.start_time else {
            return false;
        };
        if timeout.as_std().is_zero() || (now - start) <= timeout.as_std() {
            return false;
        }

        info!(%timeout, "task run timed out");
        let failed = Condition::succeeded(
            ConditionStatus::False,
            REASON_TIMEOUT,
            format!(
                "TaskRun {:?} failed to finish within {:?}",
                run.name(),
                timeout.to_string()
            ),
        );
        if !will_retry(run) {
            self.delete_pod(run).await;
        }
        self.evaluate_retry(run, failed, RunOutcome::Timeout, now).await;
        true
    }

    /// Apply a failed condition, or archive it and start over if retries remain.
    pub(super) async fn evaluate_retry(
        &self,
        run: &mut TaskRun,
        failed: Condition,
        outcome: RunOutcome,
        now: OffsetDateTime,
    ) {
        if !will_retry(run) {
            run.status.conditions.set(failed, now);
            self.complete(run, outcome, now);
            return;
        }

        let mut archived = run.status.clone();
        archived.retries_status.clear();
        archived.conditions.set(failed, now);
        archived.completion_time = Some(now);
        run.status.retries_status.push(archived);

        self.delete_pod(run).await;
        run.status.pod_name.clear();
        run.status.steps.clear();
        run.status
            .conditions
            .set(Condition::bare(ConditionStatus::Unknown), now);
        run.status.start_time = Some(now);
        run.status.completion_time = None;

        self.ctx.metrics().record_retry();
        info!(
            attempt = run.status.retries_status.len(),
            retries = run.spec.retries,
            outcome = outcome.as_label(),
            "retrying task run"
        );
    }

    pub(super) fn complete(&self, run: &mut TaskRun, outcome: RunOutcome, now: OffsetDateTime) {
        run.status.completion_time = Some(now);
        let elapsed_ms = run
            .status
            .start_time
            .map(|start| (now - start).whole_milliseconds().max(0))
            .unwrap_or(0);
        self.ctx
            .metrics()
            .record_run_completed(outcome, u64::try_from(elapsed_ms).unwrap_or(u64::MAX));
    }

    /// Delete the run's pod; failures are logged and otherwise ignored.
    pub(super) async fn delete_pod(&self, run: &TaskRun) {
        let pod = run.status.pod_name.as_str();
        if pod.is_empty() {
            return;
        }
        match self.client.delete_pod(run.namespace(), pod).await {
            Ok(()) => debug!(pod, "pod deleted"),
            Err(e) if e.is_not_found() => debug!(pod, "pod already gone"),
            Err(e) => warn!(pod, error = %e, "failed to delete pod"),
        }
    }
}

fn will_retry(run: &TaskRun) -> bool {
    run.status.retries_status.len() < run.spec.retries as usize
}
