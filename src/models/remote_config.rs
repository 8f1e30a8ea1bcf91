//! Configuration shipped to the remote side alongside the step.
//!
//! The remote bootstrap deserializes a [`RemoteConfig`] before any step code runs,
//! configures storage credentials from the single [`StorageBinding`], and exports
//! every [`SecretBinding`] as an environment variable.

use serde::{Deserialize, Serialize};

/// Storage credentials source for the remote runtime.
///
/// Serialized externally tagged (`{"s3": {...}}`), so a document always carries
/// exactly one variant; zero or several variants fail to deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBinding {
    /// Object-store credentials read from a secret scope
    S3 {
        secret_scope: String,
        access_key_key: String,
        secret_key_key: String,
    },
    /// Storage-account key for a hierarchical filesystem
    Adls2 {
        secret_scope: String,
        storage_account_name: String,
        storage_account_key_key: String,
    },
}

impl StorageBinding {
    pub fn kind(&self) -> &'static str {
        match self {
            StorageBinding::S3 { .. } => "s3",
            StorageBinding::Adls2 { .. } => "adls2",
        }
    }

    pub fn secret_scope(&self) -> &str {
        match self {
            StorageBinding::S3 { secret_scope, .. } | StorageBinding::Adls2 { secret_scope, .. } => {
                secret_scope
            }
        }
    }
}

/// A remote secret exported under `name` on the remote side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretBinding {
    /// Environment variable name the value is exported as
    pub name: String,
    /// Key of the secret within its scope
    pub key: String,
    pub scope: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub storage: StorageBinding,
    #[serde(default)]
    pub secrets: Vec<SecretBinding>,
}
