//! `${...}` substitution over a resolved task.
//!
//! Substitution is a single textual pass: replaced text is never scanned again and
//! expressions without a known value are kept verbatim.
use std::collections::HashMap;

use tkr_model::{Container, TaskSpec, Volume};
use tracing::trace;

use crate::{
    error::ResolveError,
    resolve::{BoundResource, ResolvedTaskRun},
    resource::ResourceRegistry,
};

const OPEN: &str = "${";
const CLOSE: char = '}';

/// Lookup table from expression body (`inputs.params.flags`) to value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replacements(HashMap<String, String>);

impl Replacements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameter values and resource attributes of `resolved`.
    pub fn for_run(resolved: &ResolvedTaskRun, registry: &ResourceRegistry) -> Self {
        let mut table = Self::new();
        for (name, value) in &resolved.params {
            table.insert(format!("inputs.params.{name}"), value.clone());
        }
        table.add_resources("inputs", &resolved.inputs, registry);
        table.add_resources("outputs", &resolved.outputs, registry);
        table
    }

    fn add_resources(&mut self, direction: &str, bound: &[BoundResource], registry: &ResourceRegistry) {
        for res in bound {
            let Some(handler) = registry.pick(res.type_()) else {
                continue;
            };
            for (attr, value) in handler.attributes(res) {
                self.insert(format!("{direction}.resources.{}.{attr}", res.slot), value);
            }
        }
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Substitute every known `${key}` in `input`.
    pub fn apply(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(start) = rest.find(OPEN) {
            out.push_str(&rest[..start]);
            let body = &rest[start + OPEN.len()..];
            let Some(end) = body.find(CLOSE) else {
                out.push_str(&rest[start..]);
                return out;
            };
            let key = &body[..end];
            match self.0.get(key) {
                Some(value) => out.push_str(value),
                None => out.push_str(&rest[start..start + OPEN.len() + end + 1]),
            }
            rest = &body[end + 1..];
        }
        out.push_str(rest);
        out
    }

    fn apply_in_place(&self, s: &mut String) {
        if s.contains(OPEN) {
            *s = self.apply(s);
        }
    }

    fn apply_container(&self, c: &mut Container) {
        self.apply_in_place(&mut c.image);
        c.command.iter_mut().for_each(|s| self.apply_in_place(s));
        c.args.iter_mut().for_each(|s| self.apply_in_place(s));
        if let Some(dir) = c.working_dir.as_mut() {
            self.apply_in_place(dir);
        }
        c.env.iter_mut().for_each(|v| self.apply_in_place(&mut v.value));
        for m in c.volume_mounts.iter_mut() {
            self.apply_in_place(&mut m.name);
            self.apply_in_place(&mut m.mount_path);
        }
    }

    fn apply_volume(&self, v: &mut Volume) -> Result<(), ResolveError> {
        let volume = v.name.clone();
        for source in v.source_names_mut() {
            self.apply_in_place(source);
            if source.is_empty() || source.contains(OPEN) {
                return Err(ResolveError::MalformedVolume {
                    volume,
                    value: source.clone(),
                });
            }
        }
        Ok(())
    }

    /// Copy of `spec` with steps and volumes templated.
    pub fn apply_to_spec(&self, spec: &TaskSpec) -> Result<TaskSpec, ResolveError> {
        let mut out = spec.clone();
        out.steps.iter_mut().for_each(|c| self.apply_container(c));
        for v in out.volumes.iter_mut() {
            self.apply_volume(v)?;
        }
        Ok(out)
    }
}

impl ResolvedTaskRun {
    /// Apply parameter and resource substitutions to the task body.
    pub fn templated(mut self, registry: &ResourceRegistry) -> Result<Self, ResolveError> {
        let table = Replacements::for_run(&self, registry);
        trace!(entries = table.len(), "applying replacements");
        self.spec = table.apply_to_spec(&self.spec)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tkr_model::{PipelineResourceSpec, ResourceType, VolumeMount};

    fn table() -> Replacements {
        let mut t = Replacements::new();
        t.insert("inputs.params.myarg", "foo");
        t.insert("inputs.params.loop", "${inputs.params.myarg}");
        t
    }

    #[test]
    fn replaces_known_and_keeps_unknown() {
        let t = table();
        assert_eq!(t.apply("--my-arg=${inputs.params.myarg}"), "--my-arg=foo");
        assert_eq!(t.apply("${inputs.params.nope}!"), "${inputs.params.nope}!");
        assert_eq!(t.apply("plain $HOME"), "plain $HOME");
        assert_eq!(t.apply("dangling ${inputs"), "dangling ${inputs");
    }

    #[test]
    fn substitution_is_not_recursive() {
        assert_eq!(table().apply("${inputs.params.loop}"), "${inputs.params.myarg}");
    }

    fn resolved(spec: TaskSpec) -> ResolvedTaskRun {
        ResolvedTaskRun {
            task_name: Some("templated".into()),
            spec,
            inputs: vec![BoundResource {
                slot: "workspace".into(),
                resource_name: "git-resource".into(),
                spec: PipelineResourceSpec::new(ResourceType::Git).with_param("url", "https://foo.git"),
                target_path: None,
                paths: Vec::new(),
            }],
            outputs: vec![BoundResource {
                slot: "myimage".into(),
                resource_name: "image-resource".into(),
                spec: PipelineResourceSpec::new(ResourceType::Image)
                    .with_param("url", "gcr.io/kristoff/sven"),
                target_path: None,
                paths: Vec::new(),
            }],
            params: BTreeMap::from([
                ("myarg".to_string(), "foo".to_string()),
                ("configmapname".to_string(), "configbar".to_string()),
            ]),
        }
    }

    #[test]
    fn templates_steps_and_volume_sources() {
        let spec = TaskSpec::default()
            .with_step(
                Container::new("mycontainer", "myimage")
                    .with_command(["/mycmd"])
                    .with_args([
                        "--my-arg=${inputs.params.myarg}",
                        "--my-additional-arg=${outputs.resources.myimage.url}",
                    ])
                    .with_working_dir("/workspace/${inputs.resources.workspace.name}")
                    .with_env("REV", "${inputs.resources.workspace.revision}")
                    .with_mount(VolumeMount::new("${inputs.params.configmapname}", "/cfg")),
            )
            .with_volume(Volume::config_map("cfg", "${inputs.params.configmapname}"));

        let out = resolved(spec).templated(&ResourceRegistry::builtin()).unwrap();
        let step = &out.spec.steps[0];

        assert_eq!(
            step.args,
            ["--my-arg=foo", "--my-additional-arg=gcr.io/kristoff/sven"]
        );
        assert_eq!(step.working_dir.as_deref(), Some("/workspace/git-resource"));
        assert_eq!(step.env.get("REV"), Some("master"));
        assert_eq!(step.volume_mounts[0].name, "configbar");
        assert_eq!(
            out.spec.volumes[0].config_map.as_ref().map(|c| c.name.as_str()),
            Some("configbar")
        );
    }

    #[test]
    fn unresolved_volume_source_is_malformed() {
        let spec = TaskSpec::default()
            .with_volume(Volume::secret("creds", "${inputs.params.missing}"));

        let err = resolved(spec).templated(&ResourceRegistry::builtin()).unwrap_err();
        assert!(matches!(&err, ResolveError::MalformedVolume { volume, .. } if volume == "creds"));
        assert!(err.is_terminal());
    }

    #[test]
    fn empty_volume_source_is_malformed() {
        let spec = TaskSpec::default().with_volume(Volume::claim("data", ""));
        let err = resolved(spec).templated(&ResourceRegistry::builtin()).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedVolume { .. }));
    }
}
