//! Artifact store over a locally mounted view of the shared filesystem.
//!
//! Store URIs (`dbfs:/staging/run/step/file`) are mapped onto `root/staging/run/step/file`.
//! Writes go to a temporary sibling first and are renamed into place, so a poller
//! never observes a half-written object.

use super::{ArtifactStore, StoreError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct LocalFsArtifactStore {
    root: PathBuf,
    store_uri_prefix: String,
}

impl LocalFsArtifactStore {
    pub fn new(root: impl Into<PathBuf>, store_uri_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            store_uri_prefix: store_uri_prefix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a store URI to a file under the mount root
    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let prefix = self.store_uri_prefix.trim_end_matches('/');
        let relative = path
            .strip_prefix(prefix)
            .ok_or_else(|| {
                StoreError::io(path, format!("path does not start with '{prefix}'"))
            })?
            .trim_start_matches('/');

        let relative = Path::new(relative);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(StoreError::io(path, "path escapes the store root"));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ArtifactStore for LocalFsArtifactStore {
    async fn write(&self, path: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(path, e.to_string()))?;
        }

        let staging = target.with_extension(format!("tmp-{}", Uuid::new_v4()));
        tokio::fs::write(&staging, &bytes)
            .await
            .map_err(|e| StoreError::io(path, e.to_string()))?;
        tokio::fs::rename(&staging, &target)
            .await
            .map_err(|e| StoreError::io(path, e.to_string()))?;

        debug!(path = %path, bytes = bytes.len(), "Artifact written");
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::not_found(path)),
            Err(e) => Err(StoreError::io(path, e.to_string())),
        }
    }
}
