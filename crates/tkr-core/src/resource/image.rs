use std::collections::BTreeMap;

use tkr_model::{Container, ResourceType};

use crate::{
    resolve::BoundResource,
    resource::{ResourceHandler, StepContext},
};

/// Image references: only exposed to templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageHandler;

impl ResourceHandler for ImageHandler {
    fn name(&self) -> &'static str {
        "image"
    }

    fn supports(&self, type_: ResourceType) -> bool {
        type_ == ResourceType::Image
    }

    fn attributes(&self, res: &BoundResource) -> BTreeMap<&'static str, String> {
        let param = |name: &str| res.spec.param(name).unwrap_or_default().to_string();
        BTreeMap::from([
            ("name", res.resource_name.clone()),
            ("type", ResourceType::Image.to_string()),
            ("url", param("url")),
            ("digest", param("digest")),
        ])
    }

    fn input_containers(&self, _res: &BoundResource, _ctx: StepContext<'_>) -> Vec<Container> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tkr_model::PipelineResourceSpec;

    #[test]
    fn attributes_expose_url_and_digest() {
        let res = BoundResource {
            slot: "builtImage".into(),
            resource_name: "image-resource".into(),
            spec: PipelineResourceSpec::new(ResourceType::Image)
                .with_param("URL", "gcr.io/kristoff/sven")
                .with_param("digest", "sha256:abc"),
            target_path: None,
            paths: Vec::new(),
        };

        let attrs = ImageHandler.attributes(&res);
        assert_eq!(attrs["url"], "gcr.io/kristoff/sven");
        assert_eq!(attrs["digest"], "sha256:abc");
        assert_eq!(attrs["type"], "image");
    }
}
