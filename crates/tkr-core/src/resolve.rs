//! Resolution of a run into the task it executes, its bound resources and its
//! parameter table.
use std::collections::BTreeMap;

use tkr_model::{
    Param, ParamSpec, PipelineResourceSpec, ResourceType, TaskKind, TaskResource,
    TaskResourceBinding, TaskRun, TaskSpec,
};
use tracing::{debug, instrument, trace};

use crate::{
    error::{ClientError, ResolveError},
    ports::ClusterClient,
    resource::ResourceRegistry,
};

/// Mount point of the shared workspace inside every step.
pub const WORKSPACE_DIR: &str = "/workspace";

/// A declared slot together with the resource bound to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundResource {
    /// Slot name as declared by the task.
    pub slot: String,
    /// Stored resource name, or the slot name for inline descriptions.
    pub resource_name: String,
    pub spec: PipelineResourceSpec,
    /// Workspace-relative directory declared on the slot.
    pub target_path: Option<String>,
    /// Shared-volume locations for pipeline hand-over.
    pub paths: Vec<String>,
}

impl BoundResource {
    #[inline]
    pub fn type_(&self) -> ResourceType {
        self.spec.type_
    }

    /// Directory inside the workspace that holds this resource's data.
    pub fn workspace_path(&self) -> String {
        let dir = self
            .target_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.slot);
        format!("{WORKSPACE_DIR}/{}", dir.trim_start_matches('/'))
    }
}

/// Everything the pod builder needs, looked up and validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTaskRun {
    /// Name of the referenced task; `None` for inline specs.
    pub task_name: Option<String>,
    pub spec: TaskSpec,
    /// Input bindings in declaration order.
    pub inputs: Vec<BoundResource>,
    /// Output bindings in declaration order.
    pub outputs: Vec<BoundResource>,
    /// Final parameter values: bound value, else declared default.
    pub params: BTreeMap<String, String>,
}

/// Look up the task and resources of `run` and validate its bindings and parameters.
///
/// Not-found lookups become terminal [`ResolveError`] variants; any other client
/// failure is returned as [`ResolveError::Lookup`].
#[instrument(level = "debug", skip_all, fields(run = %run.key()))]
pub async fn resolve_task_run(
    client: &dyn ClusterClient,
    registry: &ResourceRegistry,
    run: &TaskRun,
) -> Result<ResolvedTaskRun, ResolveError> {
    let (task_name, spec) = resolve_task(client, run).await?;
    trace!(task = ?task_name, steps = spec.steps.len(), "task resolved");

    let inputs = bind_resources(
        client,
        registry,
        run.namespace(),
        &spec.inputs.resources,
        &run.spec.inputs.resources,
    )
    .await?;
    let outputs = bind_resources(
        client,
        registry,
        run.namespace(),
        &spec.outputs.resources,
        &run.spec.outputs.resources,
    )
    .await?;
    let params = param_table(&spec.inputs.params, &run.spec.inputs.params)?;

    debug!(
        inputs = inputs.len(),
        outputs = outputs.len(),
        params = params.len(),
        "run resolved"
    );
    Ok(ResolvedTaskRun {
        task_name,
        spec,
        inputs,
        outputs,
        params,
    })
}

async fn resolve_task(
    client: &dyn ClusterClient,
    run: &TaskRun,
) -> Result<(Option<String>, TaskSpec), ResolveError> {
    if let Some(spec) = &run.spec.task_spec {
        return Ok((None, spec.clone()));
    }
    let Some(task_ref) = &run.spec.task_ref else {
        return Err(ResolveError::NoTask {
            run: run.name().to_string(),
        });
    };

    let (kind, found) = match task_ref.kind {
        TaskKind::Task => (
            "Task",
            client
                .get_task(run.namespace(), &task_ref.name)
                .await
                .map(|t| t.spec),
        ),
        TaskKind::ClusterTask => (
            "ClusterTask",
            client
                .get_cluster_task(&task_ref.name)
                .await
                .map(|t| t.spec),
        ),
    };
    match found {
        Ok(spec) => Ok((Some(task_ref.name.clone()), spec)),
        Err(e) if e.is_not_found() => Err(ResolveError::TaskNotFound {
            run: run.name().to_string(),
            kind,
            name: task_ref.name.clone(),
        }),
        Err(e) => Err(ResolveError::Lookup(e)),
    }
}

async fn bind_resources(
    client: &dyn ClusterClient,
    registry: &ResourceRegistry,
    namespace: &str,
    declared: &[TaskResource],
    bindings: &[TaskResourceBinding],
) -> Result<Vec<BoundResource>, ResolveError> {
    for binding in bindings {
        if !declared.iter().any(|d| d.name == binding.name) {
            return Err(ResolveError::UnknownSlot {
                slot: binding.name.clone(),
            });
        }
    }
    for slot in declared {
        if !bindings.iter().any(|b| b.name == slot.name) {
            return Err(ResolveError::UnboundSlot {
                slot: slot.name.clone(),
            });
        }
    }

    let mut out = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let Some(slot) = declared.iter().find(|d| d.name == binding.name) else {
            continue;
        };
        let (resource_name, spec) = lookup_resource(client, namespace, binding).await?;

        if spec.type_ != slot.type_ {
            return Err(ResolveError::TypeMismatch {
                slot: slot.name.clone(),
                expected: slot.type_,
                actual: spec.type_,
            });
        }
        if !registry.supports(spec.type_) {
            return Err(ResolveError::UnsupportedType(spec.type_));
        }

        out.push(BoundResource {
            slot: slot.name.clone(),
            resource_name,
            spec,
            target_path: slot.target_path.clone(),
            paths: binding.paths.clone(),
        });
    }
    Ok(out)
}

async fn lookup_resource(
    client: &dyn ClusterClient,
    namespace: &str,
    binding: &TaskResourceBinding,
) -> Result<(String, PipelineResourceSpec), ResolveError> {
    if let Some(r) = binding.resource_ref.as_ref().filter(|r| !r.name.is_empty()) {
        return match client.get_pipeline_resource(namespace, &r.name).await {
            Ok(res) => Ok((r.name.clone(), res.spec)),
            Err(ClientError::NotFound { .. }) => Err(ResolveError::ResourceNotFound {
                slot: binding.name.clone(),
                name: r.name.clone(),
            }),
            Err(e) => Err(ResolveError::Lookup(e)),
        };
    }
    match &binding.resource_spec {
        Some(spec) => Ok((binding.name.clone(), spec.clone())),
        None => Err(ResolveError::EmptyBinding {
            slot: binding.name.clone(),
        }),
    }
}

fn param_table(
    declared: &[ParamSpec],
    bound: &[Param],
) -> Result<BTreeMap<String, String>, ResolveError> {
    let missing: Vec<String> = declared
        .iter()
        .filter(|d| d.default.is_none() && !bound.iter().any(|b| b.name == d.name))
        .map(|d| d.name.clone())
        .collect();
    if !missing.is_empty() {
        return Err(ResolveError::MissingParams(missing));
    }

    let mut extra: Vec<String> = bound
        .iter()
        .filter(|b| !declared.iter().any(|d| d.name == b.name))
        .map(|b| b.name.clone())
        .collect();
    extra.dedup();
    if !extra.is_empty() {
        return Err(ResolveError::ExtraParams(extra));
    }

    let mut table: BTreeMap<String, String> = declared
        .iter()
        .filter_map(|d| d.default.as_ref().map(|v| (d.name.clone(), v.clone())))
        .collect();
    for p in bound {
        table.insert(p.name.clone(), p.value.clone());
    }
    Ok(table)
}
