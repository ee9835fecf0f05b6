use std::collections::BTreeMap;

use tkr_model::{Container, ResourceType};

use crate::{
    ports::restrict_length_with_suffix,
    resolve::BoundResource,
    resource::{ResourceHandler, StepContext},
};

const DEFAULT_REVISION: &str = "master";

/// Git repositories: fetched into the workspace, never published.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitHandler;

impl GitHandler {
    fn url(res: &BoundResource) -> String {
        res.spec.param("url").unwrap_or_default().to_string()
    }

    fn revision(res: &BoundResource) -> String {
        res.spec
            .param("revision")
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REVISION)
            .to_string()
    }
}

impl ResourceHandler for GitHandler {
    fn name(&self) -> &'static str {
        "git"
    }

    fn supports(&self, type_: ResourceType) -> bool {
        type_ == ResourceType::Git
    }

    fn attributes(&self, res: &BoundResource) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("name", res.resource_name.clone()),
            ("type", ResourceType::Git.to_string()),
            ("url", Self::url(res)),
            ("revision", Self::revision(res)),
        ])
    }

    fn input_containers(&self, res: &BoundResource, ctx: StepContext<'_>) -> Vec<Container> {
        let name = restrict_length_with_suffix(
            &format!("git-source-{}", res.resource_name),
            ctx.names,
        );
        let fetch = Container::new(name, ctx.images.git_init.clone()).with_args([
            "-url".to_string(),
            Self::url(res),
            "-revision".to_string(),
            Self::revision(res),
            "-path".to_string(),
            res.workspace_path(),
        ]);
        vec![fetch]
    }
}
