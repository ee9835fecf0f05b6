use async_trait::async_trait;

use crate::error::InspectError;

/// Looks up the configured entrypoint of a container image.
///
/// Consulted only when the entrypoint cache has no entry for the image.
#[async_trait]
pub trait ImageInspector: Send + Sync {
    async fn entrypoint(&self, image: &str) -> Result<Vec<String>, InspectError>;
}
