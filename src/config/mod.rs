//! # Launcher Configuration
//!
//! Everything the launcher needs to stage, submit, and monitor a remote step:
//! job service connection, storage and secret bindings for the remote bootstrap,
//! staging layout, and the polling budget.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use remote_step_launcher::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration (environment auto-detected)
//! let manager = ConfigManager::load()?;
//!
//! let poll_interval = manager.config().polling.poll_interval();
//! let max_wait = manager.config().polling.max_completion_wait();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::defaults;
use crate::models::{RemoteConfig, SecretBinding, StorageBinding};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root launcher configuration mirroring `launcher.yaml`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LauncherConfig {
    /// Job service connection settings
    pub job_service: JobServiceConfig,

    /// Cluster/run specification passed through verbatim to the job descriptor
    #[serde(default)]
    pub run_config: serde_json::Value,

    /// Storage credentials configured by the remote bootstrap
    pub storage: StorageBinding,

    /// Secrets exported as environment variables on the remote side
    #[serde(default)]
    pub secrets: Vec<SecretBinding>,

    /// Staging layout on the shared filesystem
    #[serde(default)]
    pub staging: StagingConfig,

    /// Poll cadence, wait budget, and read retry bounds
    #[serde(default)]
    pub polling: PollingConfig,

    /// Fetch and surface the remote job's stdout/stderr when the launch exits
    #[serde(default)]
    pub wait_for_logs: bool,

    /// Upper bound for the best-effort log retrieval on exit
    #[serde(default = "default_log_retrieval_timeout_seconds")]
    pub log_retrieval_timeout_seconds: u64,

    /// Local package zipped and shipped with every step
    #[serde(alias = "local_pipeline_package_path")]
    pub local_job_package_path: PathBuf,

    /// Local file uploaded as the remote entry point
    pub entry_point_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobServiceConfig {
    /// Job service host, e.g. `uksouth.azuredatabricks.net`
    pub host: String,
    /// Access token forwarded to the job service client
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StagingConfig {
    /// Absolute directory under which all staged artifacts live
    #[serde(default = "default_staging_prefix")]
    pub prefix: String,
    /// Prefix of the store-native URI rendering
    #[serde(default = "default_store_uri_prefix")]
    pub store_uri_prefix: String,
    /// Prefix of the local-mount rendering seen by remote job code
    #[serde(default = "default_mount_prefix")]
    pub mount_prefix: String,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            prefix: default_staging_prefix(),
            store_uri_prefix: default_store_uri_prefix(),
            mount_prefix: default_mount_prefix(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Budget for job completion and, separately, for post-completion log availability
    #[serde(default = "default_max_completion_wait_time_seconds")]
    pub max_completion_wait_time_seconds: u64,
    #[serde(default = "default_event_log_read_attempts")]
    pub event_log_read_attempts: u32,
    #[serde(default = "default_event_log_retry_delay_ms")]
    pub event_log_retry_delay_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_completion_wait_time_seconds: default_max_completion_wait_time_seconds(),
            event_log_read_attempts: default_event_log_read_attempts(),
            event_log_retry_delay_ms: default_event_log_retry_delay_ms(),
        }
    }
}

impl PollingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_completion_wait(&self) -> Duration {
        Duration::from_secs(self.max_completion_wait_time_seconds)
    }

    pub fn event_log_retry_delay(&self) -> Duration {
        Duration::from_millis(self.event_log_retry_delay_ms)
    }
}

impl LauncherConfig {
    /// Build a configuration with default staging and polling settings
    pub fn new(
        host: impl Into<String>,
        storage: StorageBinding,
        local_job_package_path: impl Into<PathBuf>,
        entry_point_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            job_service: JobServiceConfig {
                host: host.into(),
                token: String::new(),
            },
            run_config: serde_json::Value::Null,
            storage,
            secrets: Vec::new(),
            staging: StagingConfig::default(),
            polling: PollingConfig::default(),
            wait_for_logs: false,
            log_retrieval_timeout_seconds: default_log_retrieval_timeout_seconds(),
            local_job_package_path: local_job_package_path.into(),
            entry_point_path: entry_point_path.into(),
        }
    }

    /// The storage and secret bindings shipped to the remote bootstrap
    pub fn remote_config(&self) -> RemoteConfig {
        RemoteConfig {
            storage: self.storage.clone(),
            secrets: self.secrets.clone(),
        }
    }

    pub fn log_retrieval_timeout(&self) -> Duration {
        Duration::from_secs(self.log_retrieval_timeout_seconds)
    }

    /// Validate cross-field constraints that serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        if self.job_service.host.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "host",
                "job_service",
            ));
        }

        if !self.staging.prefix.starts_with('/') {
            return Err(ConfigurationError::invalid_value(
                "staging.prefix",
                &self.staging.prefix,
                "staging prefix must be an absolute path",
            ));
        }

        if self.staging.store_uri_prefix.is_empty() || self.staging.mount_prefix.is_empty() {
            return Err(ConfigurationError::invalid_value(
                "staging",
                format!(
                    "{}|{}",
                    self.staging.store_uri_prefix, self.staging.mount_prefix
                ),
                "path rendering prefixes must not be empty",
            ));
        }

        if self.polling.poll_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "polling.poll_interval_ms",
                "0",
                "poll interval must be positive",
            ));
        }

        if self.polling.max_completion_wait_time_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "polling.max_completion_wait_time_seconds",
                "0",
                "maximum wait time must be positive",
            ));
        }

        if self.polling.event_log_read_attempts == 0 {
            return Err(ConfigurationError::invalid_value(
                "polling.event_log_read_attempts",
                "0",
                "at least one read attempt is required",
            ));
        }

        let mut seen = HashSet::new();
        for secret in &self.secrets {
            if secret.name.trim().is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    "name",
                    format!("secret binding for key '{}'", secret.key),
                ));
            }
            if !seen.insert(secret.name.as_str()) {
                return Err(ConfigurationError::DuplicateSecretName {
                    name: secret.name.clone(),
                });
            }
        }

        Ok(())
    }
}

fn default_staging_prefix() -> String {
    defaults::STAGING_PREFIX.to_string()
}

fn default_store_uri_prefix() -> String {
    defaults::STORE_URI_PREFIX.to_string()
}

fn default_mount_prefix() -> String {
    defaults::MOUNT_PREFIX.to_string()
}

fn default_poll_interval_ms() -> u64 {
    defaults::POLL_INTERVAL_MS
}

fn default_max_completion_wait_time_seconds() -> u64 {
    defaults::MAX_COMPLETION_WAIT_TIME_SECONDS
}

fn default_event_log_read_attempts() -> u32 {
    defaults::EVENT_LOG_READ_ATTEMPTS
}

fn default_event_log_retry_delay_ms() -> u64 {
    defaults::EVENT_LOG_RETRY_DELAY_MS
}

fn default_log_retrieval_timeout_seconds() -> u64 {
    defaults::LOG_RETRIEVAL_TIMEOUT_SECONDS
}
