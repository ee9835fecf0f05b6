use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use tracing::{debug, trace};

use crate::{error::BuildError, ports::ImageInspector};

/// Image → entrypoint table shared by all reconcile calls.
///
/// Entries are only ever added; the first value stored for an image sticks.
#[derive(Debug, Default)]
pub struct EntrypointCache {
    entries: RwLock<HashMap<String, Vec<String>>>,
}

impl EntrypointCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache pre-populated with known entrypoints.
    pub fn seeded<I, K>(seed: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: Into<String>,
    {
        let cache = Self::new();
        for (image, command) in seed {
            cache.insert(image, command);
        }
        cache
    }

    pub fn get(&self, image: &str) -> Option<Vec<String>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(image)
            .cloned()
    }

    /// Store `command` for `image` unless an entry exists already.
    pub fn insert<K: Into<String>>(&self, image: K, command: Vec<String>) {
        if command.is_empty() {
            return;
        }
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(image.into())
            .or_insert(command);
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entrypoint of `image`, asking `inspector` on a miss and remembering the answer.
    pub async fn resolve(
        &self,
        image: &str,
        inspector: Option<&dyn ImageInspector>,
    ) -> Result<Vec<String>, BuildError> {
        if let Some(hit) = self.get(image) {
            trace!(image, "entrypoint cache hit");
            return Ok(hit);
        }
        let Some(inspector) = inspector else {
            return Err(BuildError::EntrypointUnknown {
                image: image.to_string(),
            });
        };

        let command = inspector
            .entrypoint(image)
            .await
            .map_err(|source| BuildError::Inspect {
                image: image.to_string(),
                source,
            })?;
        if command.is_empty() {
            return Err(BuildError::EmptyEntrypoint {
                image: image.to_string(),
            });
        }
        debug!(image, ?command, "entrypoint resolved by inspector");
        self.insert(image, command.clone());
        Ok(command)
    }
}
