use tkr_model::{Container, KIND_PIPELINE_RUN, TaskRun, Volume, VolumeMount};

use crate::{ports::restrict_length_with_suffix, resolve::BoundResource, resource::StepContext};

/// Mount point of the pipeline's shared claim.
pub const PVC_MOUNT: &str = "/pvc";

/// Claim a pipeline run shares between its tasks.
///
/// Bindings that list `paths` move data through this claim instead of fetching it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedClaim {
    name: String,
}

impl SharedClaim {
    /// Claim of the pipeline run owning `run`, if any.
    pub fn for_run(run: &TaskRun) -> Option<Self> {
        run.metadata
            .owner_of_kind(KIND_PIPELINE_RUN)
            .map(|owner| Self {
                name: format!("{}-pvc", owner.name),
            })
    }

    /// Volume and claim name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn volume(&self) -> Volume {
        Volume::claim(self.name.clone(), self.name.clone())
    }

    fn mount(&self) -> VolumeMount {
        VolumeMount::new(self.name.clone(), PVC_MOUNT)
    }

    fn shell(&self, base: String, script: String, mount: bool, ctx: StepContext<'_>) -> Container {
        let name = restrict_length_with_suffix(&base, ctx.names);
        let c = Container::new(name, ctx.images.bash_noop.clone())
            .with_args(["-args".to_string(), script]);
        if mount { c.with_mount(self.mount()) } else { c }
    }

    /// Create the slot directory, then copy each path from the claim into it.
    pub fn input_containers(&self, res: &BoundResource, ctx: StepContext<'_>) -> Vec<Container> {
        let dest = res.workspace_path();
        let mut out = vec![self.shell(
            format!("create-dir-{}", res.resource_name),
            format!("mkdir -p {dest}"),
            false,
            ctx,
        )];
        for path in &res.paths {
            out.push(self.shell(
                format!("source-copy-{}", res.resource_name),
                format!("cp -r {path}/. {dest}"),
                true,
                ctx,
            ));
        }
        out
    }

    /// Copy the slot directory onto the claim at each path.
    pub fn output_containers(&self, res: &BoundResource, ctx: StepContext<'_>) -> Vec<Container> {
        let src = res.workspace_path();
        let mut out = Vec::with_capacity(res.paths.len() * 2);
        for path in &res.paths {
            out.push(self.shell(
                format!("source-mkdir-{}", res.resource_name),
                format!("mkdir -p {path}"),
                true,
                ctx,
            ));
            out.push(self.shell(
                format!("source-copy-{}", res.resource_name),
                format!("cp -r {src}/. {path}"),
                true,
                ctx,
            ));
        }
        out
    }
}
