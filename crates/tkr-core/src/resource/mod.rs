//! Resource-type registry.
//!
//! Each [`ResourceHandler`] knows how one resource type is exposed to templates and
//! which containers fetch or publish it. The registry picks the handler for a bound
//! resource by type.
mod git;
pub use git::GitHandler;

mod image;
pub use image::ImageHandler;

mod transfer;
pub use transfer::{PVC_MOUNT, SharedClaim};

use std::{collections::BTreeMap, sync::Arc};

use tkr_model::{Container, ResourceType};

use crate::{config::ImagesConfig, ports::NameGenerator, resolve::BoundResource};

/// Shared inputs for building resource containers.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub images: &'a ImagesConfig,
    pub names: &'a dyn NameGenerator,
}

/// Behaviour of one resource type.
pub trait ResourceHandler: Send + Sync {
    /// Handler name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Returns `true` if this handler can handle the given type.
    fn supports(&self, type_: ResourceType) -> bool;

    /// Template attributes exposed as `${inputs.resources.<slot>.<attr>}`.
    fn attributes(&self, res: &BoundResource) -> BTreeMap<&'static str, String>;

    /// Containers that place the resource into the workspace before the steps run.
    fn input_containers(&self, res: &BoundResource, ctx: StepContext<'_>) -> Vec<Container>;

    /// Containers that publish the resource after the steps ran.
    fn output_containers(&self, _res: &BoundResource, _ctx: StepContext<'_>) -> Vec<Container> {
        Vec::new()
    }
}

/// Ordered set of resource handlers; the first supporting handler wins.
#[derive(Default)]
pub struct ResourceRegistry {
    handlers: Vec<Arc<dyn ResourceHandler>>,
}

impl ResourceRegistry {
    /// Create an empty registry.
    #[inline]
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Registry with the git and image handlers.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GitHandler));
        registry.register(Arc::new(ImageHandler));
        registry
    }

    #[inline]
    pub fn register(&mut self, handler: Arc<dyn ResourceHandler>) {
        self.handlers.push(handler);
    }

    pub fn pick(&self, type_: ResourceType) -> Option<&Arc<dyn ResourceHandler>> {
        self.handlers.iter().find(|h| h.supports(type_))
    }

    #[inline]
    pub fn supports(&self, type_: ResourceType) -> bool {
        self.pick(type_).is_some()
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.handlers.iter().map(|h| h.name()).collect();
        f.debug_struct("ResourceRegistry")
            .field("handlers", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shadow;

    impl ResourceHandler for Shadow {
        fn name(&self) -> &'static str {
            "shadow-git"
        }

        fn supports(&self, type_: ResourceType) -> bool {
            type_ == ResourceType::Git
        }

        fn attributes(&self, _res: &BoundResource) -> BTreeMap<&'static str, String> {
            BTreeMap::new()
        }

        fn input_containers(&self, _res: &BoundResource, _ctx: StepContext<'_>) -> Vec<Container> {
            Vec::new()
        }
    }

    #[test]
    fn empty_registry_supports_nothing() {
        let registry = ResourceRegistry::new();
        assert!(!registry.supports(ResourceType::Git));
        assert!(registry.pick(ResourceType::Image).is_none());
    }

    #[test]
    fn builtin_covers_both_types() {
        let registry = ResourceRegistry::builtin();
        assert_eq!(registry.pick(ResourceType::Git).map(|h| h.name()), Some("git"));
        assert_eq!(registry.pick(ResourceType::Image).map(|h| h.name()), Some("image"));
    }

    #[test]
    fn first_registered_handler_wins() {
        let mut registry = ResourceRegistry::new();
        registry.register(Arc::new(Shadow));
        registry.register(Arc::new(GitHandler));

        assert_eq!(
            registry.pick(ResourceType::Git).map(|h| h.name()),
            Some("shadow-git")
        );
    }
}
