//! # Remote-Side Helpers
//!
//! What the process running on the cluster does with the staged artifacts: decode
//! the shipped [`RemoteConfig`](crate::models::RemoteConfig), configure storage
//! credentials and secrets, and write the event log the launcher recovers.

pub mod bootstrap;
pub mod event_log_writer;

use crate::storage::StoreError;
use thiserror::Error;

pub use bootstrap::{
    bootstrap, load_remote_config, BootstrapEnvironment, SecretResolver, StaticSecretResolver,
};
pub use event_log_writer::EventLogWriter;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BootstrapError {
    #[error("Invalid remote configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Secret '{key}' not found in scope '{scope}'")]
    MissingSecret { scope: String, key: String },
}

impl BootstrapError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn missing_secret(scope: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingSecret {
            scope: scope.into(),
            key: key.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum EventLogWriteError {
    #[error("Event log {path} is already complete")]
    AlreadyComplete { path: String },

    #[error("Event log store error: {0}")]
    Store(#[from] StoreError),

    #[error("Event record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
