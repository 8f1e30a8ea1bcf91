//! # System Constants
//!
//! Artifact names, default operating limits, and lifecycle operation names shared by
//! the launcher, the remote-side helpers, and configuration defaults.

/// File names of the artifacts staged for every (run, step) pair
pub mod artifacts {
    /// Serialized `StepRunReference` handed to the remote entry point
    pub const STEP_RUN_REF_FILE_NAME: &str = "step_run_ref.json";
    /// Serialized `RemoteConfig` consumed by the remote bootstrap
    pub const REMOTE_CONFIG_FILE_NAME: &str = "remote_config.json";
    /// Zipped snapshot of the local job package
    pub const CODE_ZIP_NAME: &str = "code.zip";
    /// Append-only event log written by the remote side
    pub const EVENTS_FILE_NAME: &str = "events.jsonl";
}

/// Default values used when configuration leaves a field unset
pub mod defaults {
    pub const STAGING_PREFIX: &str = "/launcher_staging";
    pub const STORE_URI_PREFIX: &str = "dbfs:/";
    pub const MOUNT_PREFIX: &str = "/dbfs/";
    pub const POLL_INTERVAL_MS: u64 = 2_500;
    /// One day, matching the job service's own maximum run lifetime
    pub const MAX_COMPLETION_WAIT_TIME_SECONDS: u64 = 24 * 60 * 60;
    pub const EVENT_LOG_READ_ATTEMPTS: u32 = 3;
    pub const EVENT_LOG_RETRY_DELAY_MS: u64 = 0;
    pub const LOG_RETRIEVAL_TIMEOUT_SECONDS: u64 = 30;
}

/// Directory names never included in the zipped code payload
pub const EXCLUDED_CODE_DIRECTORIES: &[&str] = &[".git", "target", "__pycache__"];

/// Launch lifecycle operations reported through structured logging
pub mod operations {
    pub const ARTIFACTS_UPLOADED: &str = "launch.artifacts_uploaded";
    pub const JOB_SUBMITTED: &str = "launch.job_submitted";
    pub const JOB_TERMINAL: &str = "launch.job_terminal";
    pub const LOGS_COMPLETE: &str = "launch.logs_complete";
    pub const LAUNCH_FAILED: &str = "launch.failed";
    pub const LAUNCH_CANCELLED: &str = "launch.cancelled";
}
