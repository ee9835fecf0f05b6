//! Cancellation of a pipeline run and of the task runs it already started.
use tkr_model::{Condition, ConditionStatus, PipelineRun, TaskRun, TaskRunSpecStatus};
use tracing::{debug, instrument, warn};

use crate::{
    error::CancelError,
    ports::{Clock, ClusterClient},
    status::REASON_PIPELINE_RUN_CANCELLED,
};

/// One task of a pipeline run, with its run if it was started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildTaskRun {
    pub pipeline_task_name: String,
    pub task_run_name: String,
    pub task_run: Option<TaskRun>,
}

/// Mark `pr` cancelled and flag every started child run as cancelled.
///
/// Each child gets a status update followed by a spec update. Failures are
/// collected and reported together; updates that went through are kept.
#[instrument(level = "debug", skip_all, fields(pipeline_run = %pr.metadata.key()))]
pub async fn cancel_pipeline_run(
    client: &dyn ClusterClient,
    clock: &dyn Clock,
    pr: &mut PipelineRun,
    children: &mut [ChildTaskRun],
) -> Result<(), CancelError> {
    pr.status.conditions.set(
        Condition::succeeded(
            ConditionStatus::False,
            REASON_PIPELINE_RUN_CANCELLED,
            format!("PipelineRun {:?} was cancelled", pr.metadata.name),
        ),
        clock.now(),
    );

    let mut errors = Vec::new();
    for child in children.iter_mut() {
        let Some(run) = child.task_run.as_mut() else {
            debug!(task = %child.pipeline_task_name, "child not started, nothing to cancel");
            continue;
        };
        run.spec.status = Some(TaskRunSpecStatus::Cancelled);

        if let Err(e) = client.update_task_run_status(run).await {
            warn!(task_run = %child.task_run_name, error = %e, "failed to update child status");
            errors.push(e.to_string());
        }
        if let Err(e) = client.update_task_run(run).await {
            warn!(task_run = %child.task_run_name, error = %e, "failed to cancel child");
            errors.push(e.to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(CancelError { errors })
    }
}
