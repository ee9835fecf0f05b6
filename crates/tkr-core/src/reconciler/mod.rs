//! Level-triggered reconciliation of task runs.
//!
//! [`TaskRunReconciler::reconcile`] takes one `namespace/name` key, reads the run,
//! drives it one step closer to completion and persists the status if it changed.
//! Resolution failures and step failures become conditions on the run; only
//! transient cluster and build failures are returned to the caller.
mod context;
pub use context::ReconcilerContext;

mod lifecycle;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tkr_model::{LABEL_TASK_RUN, Labels, Pod, TaskRun};
use tracing::{Span, debug, field, info, instrument, warn};

use crate::{
    error::{BuildError, ReconcileError, ResolveError},
    metrics::RunOutcome,
    pod::PodBuilder,
    ports::ClusterClient,
    resolve::{ResolvedTaskRun, resolve_task_run},
    status::{self, Projection},
};

/// Reconciles task runs against a cluster.
pub struct TaskRunReconciler {
    client: Arc<dyn ClusterClient>,
    ctx: ReconcilerContext,
}

impl TaskRunReconciler {
    pub fn new(client: Arc<dyn ClusterClient>, ctx: ReconcilerContext) -> Self {
        Self { client, ctx }
    }

    pub fn context(&self) -> &ReconcilerContext {
        &self.ctx
    }

    /// Process one `namespace/name` key.
    ///
    /// Invalid keys, vanished runs and finished runs are no-ops.
    #[instrument(
        name = "reconcile",
        skip(self),
        fields(namespace = field::Empty, name = field::Empty)
    )]
    pub async fn reconcile(&self, key: &str) -> Result<(), ReconcileError> {
        let result = self.reconcile_key(key).await;
        if let Err(e) = &result {
            warn!(error = %e, kind = e.kind(), "reconcile failed");
            self.ctx.metrics().record_reconcile_error(e.kind());
        }
        result
    }

    async fn reconcile_key(&self, key: &str) -> Result<(), ReconcileError> {
        let Some((namespace, name)) = split_key(key) else {
            warn!(key, "invalid resource key");
            return Ok(());
        };
        Span::current()
            .record("namespace", namespace)
            .record("name", name);

        let original = match self.client.get_task_run(namespace, name).await {
            Ok(run) => run,
            Err(e) if e.is_not_found() => {
                info!("task run no longer exists");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        if original.is_done() {
            debug!("task run already finished");
            return Ok(());
        }

        let mut run = original.clone();
        // transient failures leave the stored status as it was
        self.reconcile_run(&mut run).await?;
        if run.status == original.status {
            return Ok(());
        }

        if let Err(e) = self.client.update_task_run_status(&run).await {
            warn!(error = %e, "failed to update task run status");
            return Err(e.into());
        }
        debug!(condition = ?run.condition().map(|c| c.status), "status updated");
        Ok(())
    }

    async fn reconcile_run(&self, run: &mut TaskRun) -> Result<(), ReconcileError> {
        let now = self.ctx.clock().now();

        if run.is_cancelled() {
            self.cancel(run, now).await;
            return Ok(());
        }

        if run.status.start_time.is_none() {
            run.status.start_time = Some(now);
        }
        if run.condition().is_none() {
            run.status.conditions.set(status::running(), now);
        }

        let registry = self.ctx.registry();
        let resolved = match resolve_task_run(self.client.as_ref(), registry, run)
            .await
            .and_then(|r| r.templated(registry))
        {
            Ok(resolved) => resolved,
            Err(ResolveError::Lookup(e)) => return Err(e.into()),
            Err(e) => {
                self.fail_resolution(run, &e, now);
                return Ok(());
            }
        };

        if self.check_timeout(run, now).await {
            return Ok(());
        }

        let existing = match self.existing_pod(run).await? {
            Some(pod) => Some(pod),
            None => self.adopt_pod(run).await?,
        };
        let pod = match existing {
            Some(pod) => pod,
            None => match self.submit_pod(run, &resolved).await {
                Ok(pod) => pod,
                Err(ReconcileError::Build(BuildError::Resolve(e))) if e.is_terminal() => {
                    self.fail_resolution(run, &e, now);
                    return Ok(());
                }
                Err(e) => return Err(e),
            },
        };

        let Projection { condition, steps } = status::project(&pod);
        run.status.steps = steps;

        if condition.is_false() {
            self.evaluate_retry(run, condition, RunOutcome::Failure, now).await;
        } else {
            let succeeded = condition.is_true();
            run.status.conditions.set(condition, now);
            if succeeded {
                info!(pod = %pod.metadata.name, "task run succeeded");
                self.complete(run, RunOutcome::Success, now);
            }
        }
        Ok(())
    }

    /// The pod named in the run status, or `None` when there is none yet or it vanished.
    async fn existing_pod(&self, run: &TaskRun) -> Result<Option<Pod>, ReconcileError> {
        if run.status.pod_name.is_empty() {
            return Ok(None);
        }
        match self.client.get_pod(run.namespace(), &run.status.pod_name).await {
            Ok(pod) => Ok(Some(pod)),
            Err(e) if e.is_not_found() => {
                debug!(pod = %run.status.pod_name, "pod not found, creating a new one");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// A pod already created for the current attempt whose name never made it into
    /// the stored status, e.g. because the status write after creation failed.
    ///
    /// Pods of archived attempts and pods owned by another run with the same name
    /// are never adopted.
    async fn adopt_pod(&self, run: &mut TaskRun) -> Result<Option<Pod>, ReconcileError> {
        let mut selector = Labels::new();
        selector.insert(LABEL_TASK_RUN, run.name());
        let pods = self.client.list_pods(run.namespace(), &selector).await?;

        let uid = run.metadata.uid.as_str();
        let retries = &run.status.retries_status;
        let adopted = pods
            .into_iter()
            .filter(|pod| {
                uid.is_empty() || pod.metadata.owner_references.iter().any(|o| o.uid == uid)
            })
            .filter(|pod| !retries.iter().any(|r| r.pod_name == pod.metadata.name))
            .max_by(|a, b| {
                a.metadata
                    .creation_timestamp
                    .cmp(&b.metadata.creation_timestamp)
                    .then_with(|| a.metadata.name.cmp(&b.metadata.name))
            });

        let Some(pod) = adopted else {
            return Ok(None);
        };
        info!(pod = %pod.metadata.name, "adopting pod of the current attempt");
        run.status.pod_name = pod.metadata.name.clone();
        Ok(Some(pod))
    }

    async fn submit_pod(
        &self,
        run: &mut TaskRun,
        resolved: &ResolvedTaskRun,
    ) -> Result<Pod, ReconcileError> {
        let builder = PodBuilder {
            images: &self.ctx.config().images,
            cache: self.ctx.cache(),
            inspector: self.ctx.inspector(),
            registry: self.ctx.registry(),
            names: self.ctx.names(),
            client: self.client.as_ref(),
        };
        let pod = builder.build(run, resolved).await?;
        let created = self.client.create_pod(&pod).await?;

        self.ctx.metrics().record_pod_created();
        info!(pod = %created.metadata.name, "pod created");
        run.status.pod_name = created.metadata.name.clone();
        Ok(created)
    }
}

/// Split `namespace/name`; both halves must be non-empty.
fn split_key(key: &str) -> Option<(&str, &str)> {
    let (namespace, name) = key.split_once('/')?;
    if namespace.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some((namespace, name))
}
