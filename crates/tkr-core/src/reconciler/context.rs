use std::{fmt, sync::Arc};

use crate::{
    config::ControllerConfig,
    entrypoint::EntrypointCache,
    metrics::MetricsHandle,
    ports::{Clock, ImageInspector, NameGenerator, RandomNames, SystemClock},
    resource::ResourceRegistry,
};

/// Shared state handed to every reconcile call.
///
/// Everything in here is read-mostly; cloning only bumps reference counts.
#[derive(Clone)]
pub struct ReconcilerContext {
    config: Arc<ControllerConfig>,
    cache: Arc<EntrypointCache>,
    registry: Arc<ResourceRegistry>,
    inspector: Option<Arc<dyn ImageInspector>>,
    clock: Arc<dyn Clock>,
    names: Arc<dyn NameGenerator>,
    metrics: MetricsHandle,
}

impl ReconcilerContext {
    /// Context with the entrypoint cache seeded from `config`.
    pub fn new(config: ControllerConfig) -> Self {
        let cache = EntrypointCache::seeded(config.entrypoints.clone());
        Self {
            config: Arc::new(config),
            cache: Arc::new(cache),
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn cache(&self) -> &EntrypointCache {
        &self.cache
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn inspector(&self) -> Option<&dyn ImageInspector> {
        self.inspector.as_deref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn names(&self) -> &dyn NameGenerator {
        self.names.as_ref()
    }

    /// Get a clonable handle to the metrics backend.
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }

    pub fn with_cache(mut self, cache: Arc<EntrypointCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_registry(mut self, registry: Arc<ResourceRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_inspector(mut self, inspector: Arc<dyn ImageInspector>) -> Self {
        self.inspector = Some(inspector);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_names(mut self, names: Arc<dyn NameGenerator>) -> Self {
        self.names = names;
        self
    }

    /// Replace the metrics backend and return updated context.
    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }
}

impl Default for ReconcilerContext {
    fn default() -> Self {
        Self {
            config: Arc::new(ControllerConfig::default()),
            cache: Arc::new(EntrypointCache::new()),
            registry: Arc::new(ResourceRegistry::builtin()),
            inspector: None,
            clock: Arc::new(SystemClock),
            names: Arc::new(RandomNames),
            metrics: crate::metrics::noop_metrics(),
        }
    }
}

impl fmt::Debug for ReconcilerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconcilerContext")
            .field("default_timeout", &self.config.default_timeout)
            .field("cached_entrypoints", &self.cache.len())
            .field("registry", &self.registry)
            .field("inspector", &self.inspector.is_some())
            .field("metrics", &"<handle>")
            .finish()
    }
}

impl fmt::Display for ReconcilerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ReconcilerContext(timeout={}, entrypoints={})",
            self.config.default_timeout,
            self.cache.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SequenceNames};
    use time::macros::datetime;

    #[test]
    fn default_context_uses_builtin_registry_and_empty_cache() {
        let ctx = ReconcilerContext::default();
        assert!(ctx.cache().is_empty());
        assert!(ctx.inspector().is_none());
        assert!(ctx.registry().supports(tkr_model::ResourceType::Git));
    }

    #[test]
    fn new_seeds_cache_from_config() {
        let config = ControllerConfig::from_json(
            r#"{"entrypoints": {"busybox": ["/bin/sh"], "gcc": ["/usr/bin/gcc"]}}"#,
        )
        .unwrap();
        let ctx = ReconcilerContext::new(config);
        assert_eq!(ctx.cache().len(), 2);
        assert_eq!(ctx.cache().get("busybox"), Some(vec!["/bin/sh".to_string()]));
    }

    #[test]
    fn builders_replace_ports() {
        let at = datetime!(2024-01-01 00:00 UTC);
        let ctx = ReconcilerContext::default()
            .with_clock(Arc::new(FixedClock::new(at)))
            .with_names(Arc::new(SequenceNames::new()));

        assert_eq!(ctx.clock().now(), at);
        assert_eq!(ctx.names().suffix(), "bbbbb");
    }

    #[test]
    fn display_includes_timeout_and_cache_size() {
        let ctx = ReconcilerContext::default();
        assert_eq!(ctx.to_string(), "ReconcilerContext(timeout=1h0m0s, entrypoints=0)");
    }

    #[test]
    fn metrics_handle_can_be_cloned() {
        let ctx = ReconcilerContext::default();
        let handle = ctx.metrics().clone();
        handle.record_retry();
        handle.record_run_completed(crate::metrics::RunOutcome::Success, 100);
    }
}
