//! Configuration Loader
//!
//! Environment-aware configuration loading. Sources are layered with the `config`
//! crate: the base `launcher.yaml`, an optional `launcher.{environment}.yaml`
//! override, and finally `LAUNCHER__SECTION__KEY` environment variables.

use super::error::{ConfigResult, ConfigurationError};
use super::LauncherConfig;
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const BASE_FILE_NAME: &str = "launcher.yaml";
const ENV_PREFIX: &str = "LAUNCHER";
const ENV_SEPARATOR: &str = "__";

/// Loaded, validated launcher configuration
#[derive(Debug)]
pub struct ConfigManager {
    config: LauncherConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = crate::logging::get_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    /// Useful for testing without modifying global environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        if !config_directory.is_dir() {
            return Err(ConfigurationError::directory_not_found(config_directory));
        }

        let base_path = config_directory.join(BASE_FILE_NAME);
        if !base_path.is_file() {
            return Err(ConfigurationError::config_file_not_found(vec![base_path]));
        }
        let override_path = Self::environment_file(&config_directory, environment);

        debug!(
            environment = %environment,
            config_directory = %config_directory.display(),
            "Loading launcher configuration"
        );

        let settings = Config::builder()
            .add_source(File::from(base_path).format(FileFormat::Yaml).required(true))
            .add_source(
                File::from(override_path)
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(Self::environment_source())
            .build()
            .map_err(|e| ConfigurationError::load_error(environment, e))?;

        let config = Self::finish(settings, environment)?;

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Load configuration from an in-memory YAML document, still honoring
    /// environment variable overrides
    pub fn from_yaml_str(yaml: &str, environment: &str) -> ConfigResult<ConfigManager> {
        let settings = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .add_source(Self::environment_source())
            .build()
            .map_err(|e| ConfigurationError::load_error(environment, e))?;

        let config = Self::finish(settings, environment)?;

        Ok(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: PathBuf::from("."),
        })
    }

    fn finish(settings: Config, environment: &str) -> ConfigResult<LauncherConfig> {
        let config: LauncherConfig = settings
            .try_deserialize()
            .map_err(|e| ConfigurationError::load_error(environment, e))?;

        config.validate()?;

        debug!(
            "Configuration loaded successfully: {}",
            serde_json::to_string_pretty(&Self::sanitize_config_for_logging(&config))
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );
        info!(
            environment = %environment,
            job_service_host = %config.job_service.host,
            staging_prefix = %config.staging.prefix,
            "Launcher configuration loaded"
        );

        Ok(config)
    }

    fn environment_source() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
    }

    fn environment_file(config_directory: &Path, environment: &str) -> PathBuf {
        config_directory.join(format!("launcher.{environment}.yaml"))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    /// Sanitized configuration for debugging that masks tokens and secret keys
    pub fn debug_config(&self) -> serde_json::Value {
        Self::sanitize_config_for_logging(&self.config)
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    fn sanitize_config_for_logging(config: &LauncherConfig) -> serde_json::Value {
        let mut config_json = serde_json::json!(config);
        let sensitive_patterns = ["token", "password", "secret_key", "credential"];
        Self::sanitize_json_recursive(&mut config_json, &sensitive_patterns);
        config_json
    }

    fn sanitize_json_recursive(value: &mut serde_json::Value, sensitive_patterns: &[&str]) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    let is_sensitive = sensitive_patterns
                        .iter()
                        .any(|pattern| key_lower.contains(pattern));

                    if is_sensitive {
                        *val = match val {
                            serde_json::Value::String(s) if s.is_empty() => {
                                serde_json::Value::String("[EMPTY]".to_string())
                            }
                            _ => serde_json::Value::String("[MASKED]".to_string()),
                        };
                    } else {
                        Self::sanitize_json_recursive(val, sensitive_patterns);
                    }
                }
            }
            serde_json::Value::Array(arr) => {
                for item in arr.iter_mut() {
                    Self::sanitize_json_recursive(item, sensitive_patterns);
                }
            }
            _ => {}
        }
    }
}
