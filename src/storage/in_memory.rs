//! In-process artifact store backed by a shared map.

use super::{ArtifactStore, StoreError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Artifact store held entirely in memory.
///
/// Clones share the same underlying map, so a test can hand one clone to the
/// launcher and use another to play the remote side.
#[derive(Debug, Clone, Default)]
pub struct InMemoryArtifactStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous read of an object, `None` if never written
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.read().get(path).cloned()
    }

    /// Synchronous write, replacing any existing object
    pub fn put(&self, path: impl Into<String>, bytes: Vec<u8>) {
        self.objects.write().insert(path.into(), bytes);
    }

    /// All written paths in sorted order
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.read().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn write(&self, path: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.put(path, bytes);
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        self.get(path).ok_or_else(|| StoreError::not_found(path))
    }
}
