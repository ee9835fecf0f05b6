use tkr_model::{
    ANNOTATION_SIDECAR_INJECT, API_VERSION, Container, KIND_TASK_RUN, LABEL_TASK, LABEL_TASK_RUN,
    ObjectMeta, OwnerReference, Pod, PodSpec, RestartPolicy, TaskRun, Volume, VolumeMount,
};
use tracing::{debug, instrument, trace};

use crate::{
    config::ImagesConfig,
    entrypoint::{Chain, ENTRYPOINT_BIN, EntrypointCache, PLACE_TOOLS_SCRIPT, TOOLS_DIR},
    error::{BuildError, ResolveError},
    pod::credentials::{self, Credentials},
    ports::{
        ClusterClient, ImageInspector, NameGenerator, restrict_length_with_prefix,
        restrict_length_with_suffix,
    },
    resolve::{BoundResource, ResolvedTaskRun, WORKSPACE_DIR},
    resource::{ResourceHandler, ResourceRegistry, SharedClaim, StepContext},
};

/// Prefix of every container that takes part in the entrypoint chain, except the sentinel.
pub const STEP_PREFIX: &str = "build-step-";
pub const HOME_DIR: &str = "/builder/home";
pub const CREDS_INIT_COMMAND: &str = "/ko-app/creds-init";
pub const NOP_CONTAINER: &str = "nop";
pub const NOP_ENTRYPOINT: &str = "/ko-app/nop";

const TOOLS_VOLUME: &str = "tools";
const WORKSPACE_VOLUME: &str = "workspace";
const HOME_VOLUME: &str = "home";

/// Builds the pod that executes a resolved run.
///
/// Apart from the suffixes drawn from `names`, the output depends only on its inputs.
pub struct PodBuilder<'a> {
    pub images: &'a ImagesConfig,
    pub cache: &'a EntrypointCache,
    pub inspector: Option<&'a dyn ImageInspector>,
    pub registry: &'a ResourceRegistry,
    pub names: &'a dyn NameGenerator,
    pub client: &'a dyn ClusterClient,
}

impl PodBuilder<'_> {
    #[instrument(level = "debug", skip_all, fields(run = %run.key()))]
    pub async fn build(&self, run: &TaskRun, resolved: &ResolvedTaskRun) -> Result<Pod, BuildError> {
        let creds = credentials::collect(
            self.client,
            run.namespace(),
            run.spec.service_account.as_deref(),
        )
        .await?;
        trace!(flags = creds.flags.len(), "credentials collected");

        let init_containers = vec![self.creds_init(&creds), self.place_tools()];

        let claim = SharedClaim::for_run(run);
        let (steps, uses_claim) = self.sequence(resolved, claim.as_ref())?;
        let containers = self.redirect(steps).await?;

        let mut volumes = resolved.spec.volumes.clone();
        if let Some(claim) = claim.as_ref().filter(|_| uses_claim) {
            volumes.push(claim.volume());
        }
        volumes.extend(creds.volumes());
        volumes.extend([
            Volume::empty_dir(TOOLS_VOLUME),
            Volume::empty_dir(WORKSPACE_VOLUME),
            Volume::empty_dir(HOME_VOLUME),
        ]);

        let pod = Pod {
            metadata: self.metadata(run, resolved),
            spec: PodSpec {
                service_account_name: run.spec.service_account.clone().filter(|s| !s.is_empty()),
                init_containers,
                containers,
                volumes,
                restart_policy: RestartPolicy::Never,
            },
            status: Default::default(),
        };
        debug!(
            pod = %pod.metadata.name,
            containers = pod.spec.containers.len(),
            "pod built"
        );
        Ok(pod)
    }

    fn handler(&self, res: &BoundResource) -> Result<&dyn ResourceHandler, BuildError> {
        self.registry
            .pick(res.type_())
            .map(|h| h.as_ref())
            .ok_or(BuildError::Resolve(ResolveError::UnsupportedType(res.type_())))
    }

    /// Resource inputs, then task steps, then resource outputs.
    fn sequence(
        &self,
        resolved: &ResolvedTaskRun,
        claim: Option<&SharedClaim>,
    ) -> Result<(Vec<Container>, bool), BuildError> {
        let ctx = StepContext {
            images: self.images,
            names: self.names,
        };
        let mut uses_claim = false;
        let mut out = Vec::new();

        for res in &resolved.inputs {
            match claim.filter(|_| !res.paths.is_empty()) {
                Some(claim) => {
                    uses_claim = true;
                    out.extend(claim.input_containers(res, ctx));
                }
                None => out.extend(self.handler(res)?.input_containers(res, ctx)),
            }
        }
        out.extend(resolved.spec.steps.iter().cloned());
        for res in &resolved.outputs {
            match claim.filter(|_| !res.paths.is_empty()) {
                Some(claim) => {
                    uses_claim = true;
                    out.extend(claim.output_containers(res, ctx));
                }
                None => out.extend(self.handler(res)?.output_containers(res, ctx)),
            }
        }
        Ok((out, uses_claim))
    }

    /// Rewrite every container to run through the helper, then append the sentinel.
    async fn redirect(&self, steps: Vec<Container>) -> Result<Vec<Container>, BuildError> {
        let mut chain = Chain::new();
        let mut out = Vec::with_capacity(steps.len() + 1);

        for mut c in steps {
            c.name = restrict_length_with_prefix(STEP_PREFIX, &c.name);
            let command = if c.command.is_empty() {
                self.cache.resolve(&c.image, self.inspector).await?
            } else {
                std::mem::take(&mut c.command)
            };

            let mut words = command.into_iter();
            let Some(entrypoint) = words.next() else {
                return Err(BuildError::EmptyEntrypoint { image: c.image });
            };
            let mut args: Vec<String> = words.collect();
            args.append(&mut c.args);

            c.args = chain.push(entrypoint, args).render();
            c.command = vec![ENTRYPOINT_BIN.to_string()];
            out.push(with_implicit_context(c));
        }

        let mut nop = Container::new(NOP_CONTAINER, self.images.nop.clone());
        nop.args = chain.push(NOP_ENTRYPOINT.to_string(), Vec::new()).render();
        nop.command = vec![ENTRYPOINT_BIN.to_string()];
        out.push(with_implicit_context(nop));

        Ok(out)
    }

    fn creds_init(&self, creds: &Credentials) -> Container {
        let name = restrict_length_with_suffix("credential-initializer", self.names);
        let mut c = Container::new(
            restrict_length_with_prefix(STEP_PREFIX, &name),
            self.images.creds_init.clone(),
        )
            .with_command([CREDS_INIT_COMMAND])
            .with_args(creds.flags.iter().cloned())
            .with_working_dir(WORKSPACE_DIR)
            .with_env("HOME", HOME_DIR)
            .with_mount(VolumeMount::new(WORKSPACE_VOLUME, WORKSPACE_DIR))
            .with_mount(VolumeMount::new(HOME_VOLUME, HOME_DIR));
        c.volume_mounts.extend(creds.mounts());
        c
    }

    fn place_tools(&self) -> Container {
        Container::new(
            format!("{STEP_PREFIX}place-tools"),
            self.images.entrypoint.clone(),
        )
        .with_command(["/bin/sh"])
        .with_args(["-c", PLACE_TOOLS_SCRIPT])
        .with_working_dir(WORKSPACE_DIR)
        .with_env("HOME", HOME_DIR)
        .with_mount(VolumeMount::new(TOOLS_VOLUME, TOOLS_DIR))
        .with_mount(VolumeMount::new(WORKSPACE_VOLUME, WORKSPACE_DIR))
        .with_mount(VolumeMount::new(HOME_VOLUME, HOME_DIR))
    }

    fn metadata(&self, run: &TaskRun, resolved: &ResolvedTaskRun) -> ObjectMeta {
        let mut labels = run.metadata.labels.clone();
        if let Some(task) = &resolved.task_name {
            labels.insert(LABEL_TASK, task.clone());
        }
        labels.insert(LABEL_TASK_RUN, run.name());

        let mut meta = ObjectMeta::new(
            run.namespace(),
            restrict_length_with_suffix(&format!("{}-pod", run.name()), self.names),
        );
        meta.labels = labels;
        meta.annotations.insert(ANNOTATION_SIDECAR_INJECT, "false");
        meta.owner_references.push(OwnerReference::controller(
            API_VERSION,
            KIND_TASK_RUN,
            run.name(),
            run.metadata.uid.clone(),
        ));
        meta
    }
}

/// Default working dir, `HOME`, and the tools/workspace/home mounts after the container's own.
fn with_implicit_context(mut c: Container) -> Container {
    if c.working_dir.as_deref().is_none_or(str::is_empty) {
        c.working_dir = Some(WORKSPACE_DIR.to_string());
    }
    c.env.push("HOME", HOME_DIR);
    c.volume_mounts.extend([
        VolumeMount::new(TOOLS_VOLUME, TOOLS_DIR),
        VolumeMount::new(WORKSPACE_VOLUME, WORKSPACE_DIR),
        VolumeMount::new(HOME_VOLUME, HOME_DIR),
    ]);
    c
}
