//! # Remote Artifact Storage
//!
//! Minimal capability over the shared path namespace the launcher and the remote
//! job both see: write bytes to a path, read bytes back. Reading a path that was
//! never written yields [`StoreError::NotFound`], which callers treat as "not yet
//! available" rather than as a failure.
//!
//! ## Implementations
//!
//! - [`InMemoryArtifactStore`]: shared map, for tests and embedding
//! - [`LocalFsArtifactStore`]: the shared filesystem through a local mount

pub mod in_memory;
pub mod local_fs;
pub mod path;

use async_trait::async_trait;
use thiserror::Error;

pub use in_memory::InMemoryArtifactStore;
pub use local_fs::LocalFsArtifactStore;
pub use path::{escape_step_key, PathLayout, RemoteArtifactPath};

/// Artifact store failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The path has never been written
    #[error("Artifact not found: {path}")]
    NotFound { path: String },

    /// Any other storage failure; treated as transient by readers that retry
    #[error("Artifact I/O error for {path}: {message}")]
    Io { path: String, message: String },
}

impl StoreError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn io(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Read/write access to the shared artifact namespace.
///
/// Paths are store-native URIs as rendered by [`RemoteArtifactPath::store_uri`].
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write `bytes` to `path`, replacing any existing object
    async fn write(&self, path: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// Read the full current contents of `path`
    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError>;
}
