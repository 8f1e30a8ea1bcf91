//! Remote-side environment setup from a shipped [`RemoteConfig`].

use super::BootstrapError;
use crate::models::{RemoteConfig, StorageBinding};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const S3_ACCESS_KEY_SETTING: &str = "fs.s3n.awsAccessKeyId";
pub const S3_SECRET_KEY_SETTING: &str = "fs.s3n.awsSecretAccessKey";
pub const S3_ACCESS_KEY_ENV: &str = "AWS_ACCESS_KEY_ID";
pub const S3_SECRET_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";

/// Runtime setting holding the account key of an ADLS2 storage account
pub fn adls2_account_key_setting(storage_account_name: &str) -> String {
    format!("fs.azure.account.key.{storage_account_name}.dfs.core.windows.net")
}

/// Access to the remote secret store
#[async_trait]
pub trait SecretResolver: Send + Sync {
    async fn get(&self, scope: &str, key: &str) -> Result<String, BootstrapError>;
}

/// Secrets held in memory, keyed by (scope, key)
#[derive(Debug, Clone, Default)]
pub struct StaticSecretResolver {
    secrets: BTreeMap<(String, String), String>,
}

impl StaticSecretResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(
        mut self,
        scope: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.secrets.insert((scope.into(), key.into()), value.into());
        self
    }
}

#[async_trait]
impl SecretResolver for StaticSecretResolver {
    async fn get(&self, scope: &str, key: &str) -> Result<String, BootstrapError> {
        self.secrets
            .get(&(scope.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| BootstrapError::missing_secret(scope, key))
    }
}

/// Settings and environment variables the remote process applies before running
/// the step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapEnvironment {
    pub runtime_settings: BTreeMap<String, String>,
    pub env_vars: BTreeMap<String, String>,
}

impl BootstrapEnvironment {
    /// Export every environment variable into the current process
    pub fn export_env(&self) {
        for (name, value) in &self.env_vars {
            std::env::set_var(name, value);
        }
        info!(count = self.env_vars.len(), "Exported bootstrap environment variables");
    }
}

/// Decode the remote configuration artifact
pub fn load_remote_config(bytes: &[u8]) -> Result<RemoteConfig, BootstrapError> {
    serde_json::from_slice(bytes).map_err(|e| BootstrapError::invalid_config(e.to_string()))
}

/// Resolve storage credentials and secrets for a remote step.
///
/// Exactly one storage binding is configured. Every secret binding is resolved
/// and exported under its name; a missing secret is fatal.
pub async fn bootstrap(
    config: &RemoteConfig,
    resolver: &dyn SecretResolver,
) -> Result<BootstrapEnvironment, BootstrapError> {
    let mut environment = BootstrapEnvironment::default();

    match &config.storage {
        StorageBinding::S3 {
            secret_scope,
            access_key_key,
            secret_key_key,
        } => {
            let access_key = resolver.get(secret_scope, access_key_key).await?;
            let secret_key = resolver.get(secret_scope, secret_key_key).await?;

            environment
                .runtime_settings
                .insert(S3_ACCESS_KEY_SETTING.to_string(), access_key.clone());
            environment
                .runtime_settings
                .insert(S3_SECRET_KEY_SETTING.to_string(), secret_key.clone());
            environment
                .env_vars
                .insert(S3_ACCESS_KEY_ENV.to_string(), access_key);
            environment
                .env_vars
                .insert(S3_SECRET_KEY_ENV.to_string(), secret_key);
        }
        StorageBinding::Adls2 {
            secret_scope,
            storage_account_name,
            storage_account_key_key,
        } => {
            let account_key = resolver.get(secret_scope, storage_account_key_key).await?;
            environment
                .runtime_settings
                .insert(adls2_account_key_setting(storage_account_name), account_key);
        }
    }
    debug!(storage = config.storage.kind(), "Configured storage credentials");

    for secret in &config.secrets {
        let value = resolver.get(&secret.scope, &secret.key).await?;
        environment.env_vars.insert(secret.name.clone(), value);
    }

    info!(
        storage = config.storage.kind(),
        secrets = config.secrets.len(),
        "Remote bootstrap complete"
    );
    Ok(environment)
}
